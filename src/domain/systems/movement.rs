// Human tank movement from the last received input.

use crate::domain::geometry::is_colliding_with_wall;
use crate::domain::state::Tank;
use crate::domain::tuning::tank::{TANK_RADIUS, TankTuning};
use crate::domain::world::Arena;

/// Below this speed the hull keeps its last heading.
const HEADING_MIN_SPEED: f32 = 0.1;

/// Applies pending input to every living human and ticks their weapon
/// cooldown. Input is level-triggered: the last message received stays in
/// effect until replaced.
pub fn move_humans(arena: &mut Arena, tuning: &TankTuning) {
    let grid = &arena.grid;
    for tank in arena.tanks.values_mut().filter(|t| t.is_alive_human()) {
        accelerate(tank, tuning);

        let next_x = tank.x + tank.vx;
        if is_colliding_with_wall(next_x, tank.y, TANK_RADIUS, grid) {
            tank.vx = 0.0;
        } else {
            tank.x = next_x;
        }
        let next_y = tank.y + tank.vy;
        if is_colliding_with_wall(tank.x, next_y, TANK_RADIUS, grid) {
            tank.vy = 0.0;
        } else {
            tank.y = next_y;
        }

        if tank.vx.hypot(tank.vy) > HEADING_MIN_SPEED {
            tank.angle = tank.vy.atan2(tank.vx);
        }
        tank.turret_angle = tank.pending_input.turret_angle;
        tank.fire_cooldown = tank.fire_cooldown.saturating_sub(1);
    }
}

fn accelerate(tank: &mut Tank, tuning: &TankTuning) {
    let keys = tank.pending_input.keys;
    let ax = f32::from(u8::from(keys.d)) - f32::from(u8::from(keys.a));
    let ay = f32::from(u8::from(keys.s)) - f32::from(u8::from(keys.w));

    if ax != 0.0 {
        tank.vx += ax * tuning.acceleration;
    } else {
        tank.vx *= 1.0 - tuning.friction;
    }
    if ay != 0.0 {
        tank.vy += ay * tuning.acceleration;
    } else {
        tank.vy *= 1.0 - tuning.friction;
    }

    let max_speed = tank.stats.map_or(tuning.max_speed, |s| s.max_speed);
    let speed = tank.vx.hypot(tank.vy);
    if speed > max_speed {
        let scale = max_speed / speed;
        tank.vx *= scale;
        tank.vy *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::TileGrid;
    use crate::domain::state::{EntityId, MovementKeys, PlayerInput};

    fn arena_with(tank: Tank) -> Arena {
        let mut arena = Arena::new(TileGrid::filled(10, 10, 0));
        arena.tanks.insert(tank.id, tank);
        arena
    }

    fn holding(keys: MovementKeys) -> Tank {
        let mut tank = Tank::human(1, "p", 250.0, 250.0);
        tank.pending_input = PlayerInput {
            keys,
            turret_angle: 1.25,
        };
        tank
    }

    #[test]
    fn when_key_is_held_then_tank_accelerates_up_to_max_speed() {
        let mut arena = arena_with(holding(MovementKeys {
            d: true,
            ..MovementKeys::default()
        }));
        let tuning = TankTuning::default();

        move_humans(&mut arena, &tuning);
        let tank = &arena.tanks[&EntityId::Human(1)];
        assert!((tank.vx - tuning.acceleration).abs() < 1e-6);
        assert_eq!(tank.turret_angle, 1.25);

        for _ in 0..30 {
            move_humans(&mut arena, &tuning);
        }
        let tank = &arena.tanks[&EntityId::Human(1)];
        assert!((tank.vx - tuning.max_speed).abs() < 1e-5);
        assert_eq!(tank.angle, 0.0);
    }

    #[test]
    fn when_diagonal_is_held_then_speed_is_clamped_as_a_vector() {
        let mut arena = arena_with(holding(MovementKeys {
            s: true,
            d: true,
            ..MovementKeys::default()
        }));
        let tuning = TankTuning::default();
        for _ in 0..30 {
            move_humans(&mut arena, &tuning);
        }
        let tank = &arena.tanks[&EntityId::Human(1)];
        assert!(tank.vx.hypot(tank.vy) <= tuning.max_speed + 1e-5);
        assert!((tank.angle - std::f32::consts::FRAC_PI_4).abs() < 1e-4);
    }

    #[test]
    fn when_keys_are_released_then_friction_slows_the_tank() {
        let mut tank = holding(MovementKeys::default());
        tank.vx = 2.0;
        let mut arena = arena_with(tank);
        move_humans(&mut arena, &TankTuning::default());
        assert!((arena.tanks[&EntityId::Human(1)].vx - 1.8).abs() < 1e-5);
    }

    #[test]
    fn when_next_step_enters_a_wall_then_that_axis_stops() {
        let mut tank = holding(MovementKeys {
            a: true,
            ..MovementKeys::default()
        });
        tank.x = 21.0;
        tank.vx = -2.0;
        let mut arena = arena_with(tank);
        move_humans(&mut arena, &TankTuning::default());
        let tank = &arena.tanks[&EntityId::Human(1)];
        assert_eq!(tank.x, 21.0);
        assert_eq!(tank.vx, 0.0);
    }

    #[test]
    fn when_tank_is_dead_then_input_is_ignored() {
        let mut tank = holding(MovementKeys {
            w: true,
            ..MovementKeys::default()
        });
        tank.dead = true;
        let mut arena = arena_with(tank);
        move_humans(&mut arena, &TankTuning::default());
        assert_eq!(arena.tanks[&EntityId::Human(1)].y, 250.0);
    }
}
