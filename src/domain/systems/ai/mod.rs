//! Bot behaviour, run once per tick for every living combat bot.
//!
//! Each bot goes through the same pipeline: scan for incoming bullets,
//! pick a heading (dodge or wander), ease toward it, translate with wall
//! sliding, then run its turret. What differs per tier lives in the
//! [`TierProfile`] table, not in branches here.

pub mod laser;
pub mod steering;
pub mod threat;
pub mod turret;

use super::combat::{CombatRules, HitReport};
use crate::domain::events::EventSink;
use crate::domain::state::{EntityId, LaserPhase, Tank};
use crate::domain::tuning::projectile::{DropTuning, LaserTuning};
use crate::domain::tuning::tier::{FirePattern, TierProfile};
use crate::domain::world::Arena;
use rand::Rng;

/// Advances every non-inert living bot by one tick.
///
/// A bot is taken out of the tank map while it thinks so it can read the
/// rest of the arena and fire into it freely.
pub fn update_ai_tanks<R: Rng + ?Sized>(
    arena: &mut Arena,
    rules: CombatRules,
    laser_tuning: &LaserTuning,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) {
    let bots: Vec<EntityId> = arena
        .tanks
        .values()
        .filter(|t| t.is_ai() && !t.dead && !t.kind.is_inert())
        .map(|t| t.id)
        .collect();

    for id in bots {
        let Some(mut tank) = arena.tanks.remove(&id) else {
            continue;
        };
        let profile = *tank.kind.profile();
        think(&mut tank, &profile, arena, rules, laser_tuning, drops, rng, events, report);
        arena.tanks.insert(id, tank);
    }
}

#[allow(clippy::too_many_arguments)]
fn think<R: Rng + ?Sized>(
    tank: &mut Tank,
    profile: &TierProfile,
    arena: &mut Arena,
    rules: CombatRules,
    laser_tuning: &LaserTuning,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) {
    let threats = threat::scan(tank, &arena.bullets);

    match threats.dodge {
        Some(bullet) if profile.dodges => {
            tank.target_direction = steering::avoid_bullet(tank, bullet.x, bullet.y, bullet.angle);
        }
        _ => steering::wander(tank, &arena.grid, rng),
    }
    steering::ease_heading(tank);
    steering::translate(tank, profile.move_speed, &arena.grid);

    let target = turret::find_target(tank, profile.shooting_range, &arena.tanks, &arena.grid);

    if profile.pattern == FirePattern::Beam {
        match target {
            Some(target) => {
                turret::track(tank, profile, target.bearing);
                laser::arm(tank, laser_tuning);
            }
            None if tank.laser == LaserPhase::Idle => turret::idle_sweep(tank, profile, rng),
            None => {}
        }
        laser::advance(tank, profile.fire_cooldown, arena, laser_tuning, rules, drops, rng, events, report);
    } else {
        turret::continue_burst(tank, profile, arena);
        let defended = match threats.intercept {
            Some(incoming) if profile.point_defense => turret::point_defense(tank, profile, &incoming, arena),
            _ => false,
        };
        if !defended {
            match target {
                Some(target) => {
                    turret::track(tank, profile, target.bearing);
                    turret::pull_trigger(tank, profile, &target, arena);
                }
                None => turret::idle_sweep(tank, profile, rng),
            }
        }
    }

    tank.fire_cooldown = tank.fire_cooldown.saturating_sub(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::SimEvent;
    use crate::domain::geometry::angle_between;
    use crate::domain::grid::TileGrid;
    use crate::domain::state::{Bullet, ButtonAction, GameMode, TankKind};
    use crate::domain::tuning::tier::tier_profile;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f32::consts::FRAC_PI_2;

    const RULES: CombatRules = CombatRules {
        mode: GameMode::Campaign,
        friendly_fire: false,
    };

    fn run(arena: &mut Arena) -> HitReport {
        let mut rng = StdRng::seed_from_u64(11);
        let mut events: Vec<SimEvent> = Vec::new();
        let mut report = HitReport::default();
        update_ai_tanks(
            arena,
            RULES,
            &LaserTuning::default(),
            &DropTuning::default(),
            &mut rng,
            &mut events,
            &mut report,
        );
        report
    }

    #[test]
    fn when_tank_is_inert_or_dead_then_it_does_not_move() {
        let mut arena = Arena::new(TileGrid::filled(12, 12, 0));
        let button = Tank::new(EntityId::Bot(0), TankKind::Button(ButtonAction::StartArena), 100.0, 100.0);
        let mut dead = Tank::new(EntityId::Bot(1), TankKind::Tier(2), 300.0, 300.0);
        dead.dead = true;
        arena.tanks.insert(button.id, button);
        arena.tanks.insert(dead.id, dead);

        run(&mut arena);

        let button = &arena.tanks[&EntityId::Bot(0)];
        assert_eq!((button.x, button.y), (100.0, 100.0));
        let dead = &arena.tanks[&EntityId::Bot(1)];
        assert_eq!((dead.x, dead.y), (300.0, 300.0));
    }

    #[test]
    fn when_bullet_is_incoming_then_bot_steers_perpendicular() {
        let mut arena = Arena::new(TileGrid::filled(12, 12, 0));
        let bot = Tank::new(EntityId::Bot(0), TankKind::Tier(1), 200.0, 200.0);
        arena.tanks.insert(bot.id, bot);
        arena.bullets.push(Bullet {
            id: 1,
            owner: EntityId::Human(9),
            x: 150.0,
            y: 210.0,
            angle: 0.0,
            speed: 4.0,
            bounces: 1,
            armed: true,
        });

        run(&mut arena);

        let bot = &arena.tanks[&EntityId::Bot(0)];
        assert!(angle_between(bot.target_direction, -FRAC_PI_2) < 1e-4);
        // Heading is eased, not snapped.
        assert!(bot.angle < 0.0 && bot.angle > -FRAC_PI_2);
    }

    #[test]
    fn when_human_is_in_sight_then_bot_fires_and_starts_cooldown() {
        let mut arena = Arena::new(TileGrid::filled(12, 12, 0));
        let bot = Tank::new(EntityId::Bot(0), TankKind::Tier(1), 200.0, 300.0);
        let human = Tank::human(1, "p", 350.0, 300.0);
        arena.tanks.insert(bot.id, bot);
        arena.tanks.insert(human.id, human);

        run(&mut arena);

        assert_eq!(arena.bullets_owned_by(EntityId::Bot(0)), 1);
        assert_eq!(
            arena.tanks[&EntityId::Bot(0)].fire_cooldown,
            tier_profile(1).fire_cooldown - 1
        );
    }

    #[test]
    fn when_beamer_sees_a_human_then_it_starts_charging() {
        let mut arena = Arena::new(TileGrid::filled(12, 12, 0));
        let bot = Tank::new(EntityId::Bot(0), TankKind::Tier(5), 100.0, 300.0);
        let human = Tank::human(1, "p", 400.0, 300.0);
        arena.tanks.insert(bot.id, bot);
        arena.tanks.insert(human.id, human);

        run(&mut arena);

        let bot = &arena.tanks[&EntityId::Bot(0)];
        assert!(matches!(bot.laser, LaserPhase::Charging { .. }));
        assert!(arena.bullets.is_empty());
        assert_eq!(arena.lasers.len(), 1);
        assert!(!arena.lasers[0].is_active);
    }
}
