/// Per-tier stat profiles for AI tanks.
///
/// Each tier supplies a small parameter record plus the fire pattern that
/// the turret controller dispatches on. Buttons and chests share the inert
/// profile: they never move, aim or shoot.
use super::TILE_SIZE;

/// Highest combat tier.
pub const MAX_TIER: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirePattern {
    /// One bullet per trigger pull.
    Single,
    /// `shots` bullets, `delay` ticks apart.
    Burst { shots: u32, delay: u32 },
    /// `count` bullets fanned around the turret heading.
    Spread { count: u32 },
    /// Charge, then sustain a damaging beam.
    Beam,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierProfile {
    /// Maximum distance at which a human counts as a target.
    pub shooting_range: f32,
    /// Turret easing factor per tick while tracking; also bounds idle sweep speed.
    pub turret_rate: f32,
    /// Ticks between trigger pulls.
    pub fire_cooldown: u32,
    /// Forward speed in world units per tick.
    pub move_speed: f32,
    pub bullet_speed: f32,
    pub bullet_bounces: u32,
    /// Concurrent live bullets this tank may own.
    pub max_bullets: u32,
    pub starts_shielded: bool,
    /// Reacts to incoming bullets by steering away.
    pub dodges: bool,
    /// Shoots down incoming bullets on a collision course.
    pub point_defense: bool,
    pub pattern: FirePattern,
}

const fn tiles(n: f32) -> f32 {
    n * TILE_SIZE
}

const TIERS: [TierProfile; 8] = [
    // 0: rookie - slow, sluggish turret, long pauses.
    TierProfile {
        shooting_range: tiles(3.5),
        turret_rate: 0.03,
        fire_cooldown: 120,
        move_speed: 0.8,
        bullet_speed: 3.0,
        bullet_bounces: 0,
        max_bullets: 2,
        starts_shielded: false,
        dodges: false,
        point_defense: false,
        pattern: FirePattern::Single,
    },
    // 1: grunt - the baseline.
    TierProfile {
        shooting_range: tiles(4.5),
        turret_rate: 0.05,
        fire_cooldown: 80,
        move_speed: 1.5,
        bullet_speed: 4.0,
        bullet_bounces: 1,
        max_bullets: 3,
        starts_shielded: false,
        dodges: true,
        point_defense: false,
        pattern: FirePattern::Single,
    },
    // 2: marksman - long range, fast bullets, slow trigger.
    TierProfile {
        shooting_range: tiles(8.0),
        turret_rate: 0.06,
        fire_cooldown: 140,
        move_speed: 1.2,
        bullet_speed: 7.0,
        bullet_bounces: 1,
        max_bullets: 2,
        starts_shielded: false,
        dodges: true,
        point_defense: false,
        pattern: FirePattern::Single,
    },
    // 3: burster - fast mover, two-shot bursts.
    TierProfile {
        shooting_range: tiles(5.0),
        turret_rate: 0.06,
        fire_cooldown: 110,
        move_speed: 2.0,
        bullet_speed: 4.5,
        bullet_bounces: 1,
        max_bullets: 4,
        starts_shielded: false,
        dodges: true,
        point_defense: false,
        pattern: FirePattern::Burst { shots: 2, delay: 8 },
    },
    // 4: enforcer - quick, rapid fire, shielded, shoots bullets down.
    TierProfile {
        shooting_range: tiles(5.0),
        turret_rate: 0.08,
        fire_cooldown: 40,
        move_speed: 2.0,
        bullet_speed: 5.0,
        bullet_bounces: 1,
        max_bullets: 4,
        starts_shielded: true,
        dodges: true,
        point_defense: true,
        pattern: FirePattern::Single,
    },
    // 5: beamer - slow, long-range laser.
    TierProfile {
        shooting_range: tiles(9.0),
        turret_rate: 0.03,
        fire_cooldown: 240,
        move_speed: 0.8,
        bullet_speed: 0.0,
        bullet_bounces: 0,
        max_bullets: 0,
        starts_shielded: false,
        dodges: true,
        point_defense: false,
        pattern: FirePattern::Beam,
    },
    // 6: trishot - fast, shielded, triple spread.
    TierProfile {
        shooting_range: tiles(5.0),
        turret_rate: 0.07,
        fire_cooldown: 70,
        move_speed: 2.2,
        bullet_speed: 4.5,
        bullet_bounces: 1,
        max_bullets: 6,
        starts_shielded: true,
        dodges: true,
        point_defense: true,
        pattern: FirePattern::Spread { count: 3 },
    },
    // 7: spammer - slow mover, very high fire rate.
    TierProfile {
        shooting_range: tiles(6.0),
        turret_rate: 0.08,
        fire_cooldown: 15,
        move_speed: 1.0,
        bullet_speed: 4.0,
        bullet_bounces: 0,
        max_bullets: 10,
        starts_shielded: false,
        dodges: true,
        point_defense: true,
        pattern: FirePattern::Single,
    },
];

/// Profile shared by buttons and chests.
pub const INERT: TierProfile = TierProfile {
    shooting_range: 0.0,
    turret_rate: 0.0,
    fire_cooldown: 0,
    move_speed: 0.0,
    bullet_speed: 0.0,
    bullet_bounces: 0,
    max_bullets: 0,
    starts_shielded: false,
    dodges: false,
    point_defense: false,
    pattern: FirePattern::Single,
};

/// Looks up a combat tier; tiers above the table clamp to the strongest.
pub fn tier_profile(tier: u8) -> &'static TierProfile {
    &TIERS[usize::from(tier.min(MAX_TIER))]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_tier_is_out_of_range_then_profile_clamps_to_highest() {
        assert_eq!(tier_profile(42), tier_profile(MAX_TIER));
    }

    #[test]
    fn when_tier_is_zero_then_it_never_dodges() {
        assert!(!tier_profile(0).dodges);
        assert!((1..=MAX_TIER).all(|t| tier_profile(t).dodges));
    }

    #[test]
    fn when_tier_is_beamer_then_point_defense_is_off() {
        // Tier 5 sits inside the point-defense band but relies on its beam.
        assert!(tier_profile(4).point_defense);
        assert!(!tier_profile(5).point_defense);
        assert_eq!(tier_profile(5).pattern, FirePattern::Beam);
    }

    #[test]
    fn when_profile_is_inert_then_it_cannot_move_or_shoot() {
        assert_eq!(INERT.move_speed, 0.0);
        assert_eq!(INERT.shooting_range, 0.0);
        assert_eq!(INERT.max_bullets, 0);
    }
}
