/// Gameplay tuning for projectiles, lasers and pickups.

/// Bullet collision radius in world units.
pub const BULLET_RADIUS: f32 = 5.0;

/// Default bullet speed in world units per tick.
pub const BULLET_SPEED: f32 = 4.0;

/// Scale applied to the barrel length when placing a new bullet.
pub const MUZZLE_OFFSET_SCALE: f32 = 1.3;

/// Angular gap between neighbouring barrels of a spread/multi-shot volley.
pub const SPREAD_ANGLE: f32 = std::f32::consts::PI / 11.0;

/// Height at which explosions are reported to clients.
pub const EXPLOSION_Z: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct LaserTuning {
    /// Ticks spent charging (aim line visible, no damage).
    pub charge_ticks: u32,

    /// Ticks the active beam is sustained.
    pub sustain_ticks: u32,

    /// Ticks between damage applications while a beam rests on a tank.
    pub damage_interval: u32,

    /// Ray-march step length in world units.
    pub step: f32,

    /// Ticks a published beam segment stays in the lobby collection.
    pub segment_ttl: u32,

    /// Ticks a human waits between beams when the player laser is enabled.
    pub player_cooldown: u32,
}

impl Default for LaserTuning {
    fn default() -> Self {
        Self {
            charge_ticks: 60,
            sustain_ticks: 90,
            damage_interval: 30,
            step: 5.0,
            segment_ttl: 2,
            player_cooldown: 180,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DropTuning {
    /// Extra reach beyond the tank box for collecting a drop.
    pub pickup_radius: f32,

    /// Ticks a drop lies on the floor before it expires.
    pub lifetime_ticks: u32,

    /// Survival kills between bonus drops.
    pub survival_kills_per_drop: u32,

    /// Chance of an extra chest bot when a campaign level loads.
    pub campaign_chest_chance: f64,
}

impl Default for DropTuning {
    fn default() -> Self {
        Self {
            pickup_radius: 12.5,
            lifetime_ticks: 30 * 60,
            survival_kills_per_drop: 5,
            campaign_chest_chance: 0.3,
        }
    }
}
