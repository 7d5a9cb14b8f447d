// Drop collection, drop expiry and buff-derived stats.

use crate::domain::geometry::is_colliding_with_tank;
use crate::domain::state::{BuffKind, Buffs, DerivedStats, GameMode};
use crate::domain::tuning::projectile::{BULLET_SPEED, DropTuning};
use crate::domain::tuning::tank::TankTuning;
use crate::domain::world::Arena;
use tracing::debug;

/// Base bounce count of a human bullet.
const BASE_BOUNCES: u32 = 1;

/// Stats a human tank fights with, given its buffs.
///
/// Survival trades the live-bullet cap for a fire-rate limit, so only that
/// mode has a non-zero cooldown.
pub fn derive_stats(buffs: &Buffs, mode: GameMode, tuning: &TankTuning) -> DerivedStats {
    let fire_cooldown = if mode == GameMode::Survival {
        tuning
            .survival_fire_cooldown
            .saturating_sub(tuning.cooldown_per_buff * buffs.fire_rate)
            .max(tuning.min_fire_cooldown)
    } else {
        0
    };
    DerivedStats {
        max_speed: tuning.max_speed * (1.0 + tuning.speed_per_buff * buffs.speed as f32),
        max_bullets: tuning.base_max_bullets + buffs.fire_rate,
        fire_cooldown,
        bullet_speed: BULLET_SPEED * (1.0 + tuning.bullet_speed_per_buff * buffs.bullet_speed as f32),
        bullet_bounces: BASE_BOUNCES + buffs.bullet_bounces,
        multi_shot: buffs.multi_shot,
    }
}

/// Recomputes stats for every human.
pub fn refresh_stats(arena: &mut Arena, mode: GameMode, tuning: &TankTuning) {
    for tank in arena.tanks.values_mut().filter(|t| !t.is_ai()) {
        tank.stats = Some(derive_stats(&tank.buffs, mode, tuning));
    }
}

/// Hands each drop to the first living human touching it. Returns whether
/// the drop list changed.
pub fn collect_drops(arena: &mut Arena, tuning: &DropTuning) -> bool {
    let before = arena.drops.len();
    let tanks = &mut arena.tanks;
    arena.drops.retain(|drop| {
        let collector = tanks
            .values_mut()
            .find(|t| t.is_alive_human() && is_colliding_with_tank(drop.x, drop.y, t, tuning.pickup_radius));
        let Some(tank) = collector else {
            return true;
        };
        tank.buffs.increment(drop.buff);
        if drop.buff == BuffKind::Shield {
            tank.shield_charges += 1;
        }
        debug!(player = %tank.id, buff = drop.buff.as_str(), "drop collected");
        false
    });
    arena.drops.len() != before
}

/// Counts drop lifetimes down. Returns whether any drop expired.
pub fn age_drops(arena: &mut Arena) -> bool {
    let before = arena.drops.len();
    for drop in &mut arena.drops {
        drop.ttl = drop.ttl.saturating_sub(1);
    }
    arena.drops.retain(|d| d.ttl > 0);
    arena.drops.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::TileGrid;
    use crate::domain::state::{Drop, EntityId, Tank};

    fn drop_at(x: f32, y: f32, buff: BuffKind) -> Drop {
        Drop {
            id: 1,
            x,
            y,
            buff,
            ttl: 100,
        }
    }

    #[test]
    fn when_no_buffs_then_stats_match_base_tuning() {
        let tuning = TankTuning::default();
        let stats = derive_stats(&Buffs::default(), GameMode::Arena, &tuning);
        assert_eq!(stats.max_speed, tuning.max_speed);
        assert_eq!(stats.max_bullets, tuning.base_max_bullets);
        assert_eq!(stats.fire_cooldown, 0);
        assert_eq!(stats.bullet_bounces, 1);
        assert_eq!(stats.multi_shot, 0);
    }

    #[test]
    fn when_fire_rate_stacks_in_survival_then_cooldown_floors_at_minimum() {
        let tuning = TankTuning::default();
        let mut buffs = Buffs::default();
        assert_eq!(derive_stats(&buffs, GameMode::Survival, &tuning).fire_cooldown, 30);
        buffs.fire_rate = 2;
        assert_eq!(derive_stats(&buffs, GameMode::Survival, &tuning).fire_cooldown, 22);
        buffs.fire_rate = 50;
        assert_eq!(derive_stats(&buffs, GameMode::Survival, &tuning).fire_cooldown, 6);
    }

    #[test]
    fn when_human_drives_over_drop_then_buff_is_applied() {
        let mut arena = Arena::new(TileGrid::filled(5, 5, 0));
        arena.tanks.insert(EntityId::Human(1), Tank::human(1, "p", 100.0, 100.0));
        arena.drops.push(drop_at(125.0, 100.0, BuffKind::Shield));
        arena.drops.push(drop_at(200.0, 200.0, BuffKind::Speed));

        assert!(collect_drops(&mut arena, &DropTuning::default()));
        let tank = &arena.tanks[&EntityId::Human(1)];
        assert_eq!(tank.buffs.shield, 1);
        assert_eq!(tank.shield_charges, 1);
        assert_eq!(arena.drops.len(), 1);
    }

    #[test]
    fn when_bot_or_dead_human_touches_drop_then_it_stays() {
        let mut arena = Arena::new(TileGrid::filled(5, 5, 0));
        let mut dead = Tank::human(1, "p", 100.0, 100.0);
        dead.dead = true;
        arena.tanks.insert(dead.id, dead);
        arena.tanks.insert(
            EntityId::Bot(0),
            Tank::new(EntityId::Bot(0), crate::domain::state::TankKind::Tier(1), 100.0, 100.0),
        );
        arena.drops.push(drop_at(100.0, 100.0, BuffKind::Speed));
        assert!(!collect_drops(&mut arena, &DropTuning::default()));
        assert_eq!(arena.drops.len(), 1);
    }

    #[test]
    fn when_drop_lifetime_runs_out_then_it_expires() {
        let mut arena = Arena::new(TileGrid::filled(5, 5, 0));
        let mut drop = drop_at(0.0, 0.0, BuffKind::MultiShot);
        drop.ttl = 2;
        arena.drops.push(drop);
        assert!(!age_drops(&mut arena));
        assert!(age_drops(&mut arena));
        assert!(arena.drops.is_empty());
    }
}
