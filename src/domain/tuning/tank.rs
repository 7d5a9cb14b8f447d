/// Gameplay tuning for human-controlled tanks.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

/// Half-width of a tank's square collision box in world units.
pub const TANK_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct TankTuning {
    /// Base top speed in world units per tick.
    pub max_speed: f32,

    /// Velocity gained per tick while a movement key is held.
    pub acceleration: f32,

    /// Fraction of velocity lost per tick when no key is held.
    pub friction: f32,

    /// Concurrent live bullets a fresh tank may own.
    pub base_max_bullets: u32,

    /// Ticks between shots in survival before fire-rate buffs.
    pub survival_fire_cooldown: u32,

    /// Floor for the survival fire cooldown after buffs.
    pub min_fire_cooldown: u32,

    /// Ticks a tank killed in the lobby waits before respawning.
    pub lobby_respawn_ticks: u32,

    /// Extra top speed per speed buff, as a fraction of base.
    pub speed_per_buff: f32,

    /// Extra bullet speed per bullet-speed buff, as a fraction of base.
    pub bullet_speed_per_buff: f32,

    /// Cooldown ticks removed per fire-rate buff in survival.
    pub cooldown_per_buff: u32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            max_speed: 2.2,
            acceleration: 0.3,
            friction: 0.1,
            base_max_bullets: 5,
            survival_fire_cooldown: 30,
            min_fire_cooldown: 6,
            lobby_respawn_ticks: 180,
            speed_per_buff: 0.15,
            bullet_speed_per_buff: 0.2,
            cooldown_per_buff: 4,
        }
    }
}
