// Charge-then-sustain beams: the tier 5 weapon and the optional player laser.

use crate::domain::events::EventSink;
use crate::domain::geometry::is_colliding_with_tank;
use crate::domain::grid::tile_of;
use crate::domain::state::{EntityId, Laser, LaserPhase, Tank};
use crate::domain::systems::combat::{CombatRules, HitReport, apply_hit};
use crate::domain::tuning::projectile::{DropTuning, LaserTuning};
use crate::domain::world::Arena;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamTrace {
    pub x2: f32,
    pub y2: f32,
    /// First living tank the beam touched, other than its owner.
    pub hit: Option<EntityId>,
}

/// Marches a beam from `(x, y)` until it leaves the grid, enters a wall tile
/// or crosses a tank. The march is capped at the world diagonal.
pub fn trace_beam(arena: &Arena, owner: EntityId, x: f32, y: f32, angle: f32, step: f32) -> BeamTrace {
    let (width, height) = arena.grid.world_size();
    let max_distance = width.hypot(height);
    let (dx, dy) = (angle.cos() * step, angle.sin() * step);
    let (mut px, mut py) = (x, y);
    let mut travelled = 0.0;

    while travelled < max_distance {
        px += dx;
        py += dy;
        travelled += step;

        match arena.grid.get(tile_of(px), tile_of(py)) {
            Some(value) if value <= 0 => {}
            _ => break,
        }
        let hit = arena
            .tanks
            .values()
            .find(|t| t.id != owner && is_colliding_with_tank(px, py, t, 0.0))
            .map(|t| t.id);
        if hit.is_some() {
            return BeamTrace { x2: px, y2: py, hit };
        }
    }
    BeamTrace { x2: px, y2: py, hit: None }
}

/// Puts an idle bot beam into its charge phase.
pub fn arm(tank: &mut Tank, tuning: &LaserTuning) {
    if tank.laser == LaserPhase::Idle && tank.fire_cooldown == 0 {
        tank.laser = LaserPhase::Charging {
            ticks_left: tuning.charge_ticks,
        };
    }
}

/// Player beams skip the charge phase. Returns whether a beam started.
pub fn fire_player_laser(tank: &mut Tank, tuning: &LaserTuning) -> bool {
    if tank.dead || tank.laser != LaserPhase::Idle {
        return false;
    }
    tank.laser = LaserPhase::Firing {
        ticks_left: tuning.sustain_ticks,
    };
    tank.laser_damage_timer = 0;
    true
}

/// Advances a beam one tick along the tank's turret: publishes the segment,
/// applies damage every `damage_interval` ticks while firing, and cools down
/// for `cooldown` ticks afterwards.
#[allow(clippy::too_many_arguments)]
pub fn advance<R: Rng + ?Sized>(
    tank: &mut Tank,
    cooldown: u32,
    arena: &mut Arena,
    tuning: &LaserTuning,
    rules: CombatRules,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) {
    match tank.laser {
        LaserPhase::Idle => {}
        LaserPhase::Charging { ticks_left } => {
            publish(tank, arena, tuning, false);
            tank.laser = if ticks_left <= 1 {
                tank.laser_damage_timer = 0;
                LaserPhase::Firing {
                    ticks_left: tuning.sustain_ticks,
                }
            } else {
                LaserPhase::Charging {
                    ticks_left: ticks_left - 1,
                }
            };
        }
        LaserPhase::Firing { ticks_left } => {
            let trace = publish(tank, arena, tuning, true);
            tank.laser_damage_timer = tank.laser_damage_timer.saturating_sub(1);
            if let Some(victim) = trace.hit {
                if tank.laser_damage_timer == 0 {
                    apply_hit(arena, tank.id, victim, rules, drops, rng, events, report);
                    tank.laser_damage_timer = tuning.damage_interval;
                }
            }
            tank.laser = if ticks_left <= 1 {
                LaserPhase::Cooling { ticks_left: cooldown }
            } else {
                LaserPhase::Firing {
                    ticks_left: ticks_left - 1,
                }
            };
        }
        LaserPhase::Cooling { ticks_left } => {
            tank.laser = if ticks_left <= 1 {
                LaserPhase::Idle
            } else {
                LaserPhase::Cooling {
                    ticks_left: ticks_left - 1,
                }
            };
        }
    }
}

fn publish(tank: &Tank, arena: &mut Arena, tuning: &LaserTuning, is_active: bool) -> BeamTrace {
    let trace = trace_beam(arena, tank.id, tank.x, tank.y, tank.turret_angle, tuning.step);
    arena.lasers.push(Laser {
        owner: tank.id,
        x1: tank.x,
        y1: tank.y,
        x2: trace.x2,
        y2: trace.y2,
        is_active,
        duration: tuning.segment_ttl,
    });
    trace
}

/// Runs every human beam that is not idle.
pub fn tick_player_lasers<R: Rng + ?Sized>(
    arena: &mut Arena,
    tuning: &LaserTuning,
    rules: CombatRules,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) {
    let active: Vec<EntityId> = arena
        .humans()
        .filter(|t| t.laser != LaserPhase::Idle)
        .map(|t| t.id)
        .collect();

    for id in active {
        let Some(mut tank) = arena.tanks.remove(&id) else {
            continue;
        };
        if tank.dead {
            tank.laser = LaserPhase::Idle;
        } else {
            advance(&mut tank, tuning.player_cooldown, arena, tuning, rules, drops, rng, events, report);
        }
        arena.tanks.insert(id, tank);
    }
}

/// Ages published segments and drops the expired ones.
pub fn prune_lasers(arena: &mut Arena) {
    for laser in &mut arena.lasers {
        laser.duration = laser.duration.saturating_sub(1);
    }
    arena.lasers.retain(|l| l.duration > 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::SimEvent;
    use crate::domain::grid::TileGrid;
    use crate::domain::state::{GameMode, TankKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const RULES: CombatRules = CombatRules {
        mode: GameMode::Campaign,
        friendly_fire: false,
    };

    fn short_beam() -> LaserTuning {
        LaserTuning {
            charge_ticks: 2,
            sustain_ticks: 3,
            damage_interval: 2,
            step: 5.0,
            segment_ttl: 2,
            player_cooldown: 4,
        }
    }

    #[test]
    fn when_beam_meets_wall_then_it_stops_there() {
        let mut grid = TileGrid::filled(3, 10, 0);
        grid.set(6, 1, 1);
        let arena = Arena::new(grid);
        let trace = trace_beam(&arena, EntityId::Bot(0), 75.0, 75.0, 0.0, 5.0);
        assert_eq!(trace.hit, None);
        assert!(trace.x2 >= 295.0 && trace.x2 <= 305.0);
    }

    #[test]
    fn when_beam_crosses_tank_then_it_reports_the_hit() {
        let mut arena = Arena::new(TileGrid::filled(3, 10, 0));
        arena.tanks.insert(EntityId::Human(2), Tank::human(2, "p", 200.0, 75.0));
        let trace = trace_beam(&arena, EntityId::Bot(0), 75.0, 75.0, 0.0, 5.0);
        assert_eq!(trace.hit, Some(EntityId::Human(2)));
        assert!(trace.x2 > 180.0 && trace.x2 < 220.0);
    }

    #[test]
    fn when_bot_beam_runs_then_it_charges_fires_and_cools_down() {
        let tuning = short_beam();
        let mut arena = Arena::new(TileGrid::filled(3, 10, 0));
        let mut victim = Tank::human(2, "p", 300.0, 75.0);
        victim.shield_charges = 5;
        arena.tanks.insert(victim.id, victim);

        let mut bot = Tank::new(EntityId::Bot(1), TankKind::Tier(5), 75.0, 75.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut events: Vec<SimEvent> = Vec::new();
        let mut report = HitReport::default();
        let mut step = |bot: &mut Tank, arena: &mut Arena| {
            advance(bot, 10, arena, &tuning, RULES, &DropTuning::default(), &mut rng, &mut events, &mut report);
        };

        arm(&mut bot, &tuning);
        assert_eq!(bot.laser, LaserPhase::Charging { ticks_left: 2 });
        step(&mut bot, &mut arena);
        step(&mut bot, &mut arena);
        assert!(arena.lasers.iter().all(|l| !l.is_active));
        assert_eq!(bot.laser, LaserPhase::Firing { ticks_left: 3 });
        assert_eq!(arena.tanks[&EntityId::Human(2)].shield_charges, 5);

        for _ in 0..3 {
            step(&mut bot, &mut arena);
        }
        assert_eq!(arena.tanks[&EntityId::Human(2)].shield_charges, 3);
        assert_eq!(bot.laser, LaserPhase::Cooling { ticks_left: 10 });
        assert!(arena.lasers.iter().any(|l| l.is_active));

        arm(&mut bot, &tuning);
        assert!(matches!(bot.laser, LaserPhase::Cooling { .. }));
        for _ in 0..10 {
            step(&mut bot, &mut arena);
        }
        assert_eq!(bot.laser, LaserPhase::Idle);
    }

    #[test]
    fn when_player_fires_laser_then_only_one_beam_runs_at_a_time() {
        let tuning = short_beam();
        let mut tank = Tank::human(1, "p", 0.0, 0.0);
        assert!(fire_player_laser(&mut tank, &tuning));
        assert!(!fire_player_laser(&mut tank, &tuning));

        let mut dead = Tank::human(2, "q", 0.0, 0.0);
        dead.dead = true;
        assert!(!fire_player_laser(&mut dead, &tuning));
    }

    #[test]
    fn when_player_beam_hits_a_bot_then_the_bot_dies() {
        let tuning = short_beam();
        let mut arena = Arena::new(TileGrid::filled(3, 10, 0));
        let mut shooter = Tank::human(1, "p", 75.0, 75.0);
        assert!(fire_player_laser(&mut shooter, &tuning));
        arena.tanks.insert(shooter.id, shooter);
        arena.tanks.insert(EntityId::Bot(0), Tank::new(EntityId::Bot(0), TankKind::Tier(1), 300.0, 75.0));

        let mut rng = StdRng::seed_from_u64(2);
        let mut events: Vec<SimEvent> = Vec::new();
        let mut report = HitReport::default();
        tick_player_lasers(&mut arena, &tuning, RULES, &DropTuning::default(), &mut rng, &mut events, &mut report);

        assert!(arena.tanks[&EntityId::Bot(0)].dead);
        assert_eq!(report.kills.len(), 1);
        assert_eq!(arena.lasers.len(), 1);
        assert!(arena.tanks.contains_key(&EntityId::Human(1)));
    }

    #[test]
    fn when_segments_age_then_expired_ones_are_pruned() {
        let mut arena = Arena::new(TileGrid::filled(1, 1, 0));
        for duration in [1, 2] {
            arena.lasers.push(Laser {
                owner: EntityId::Bot(0),
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
                is_active: true,
                duration,
            });
        }
        prune_lasers(&mut arena);
        assert_eq!(arena.lasers.len(), 1);
        assert_eq!(arena.lasers[0].duration, 1);
    }
}
