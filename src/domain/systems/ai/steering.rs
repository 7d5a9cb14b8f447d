// Hull control for bots: dodging, wandering and wall-aware translation.

use crate::domain::geometry::{detect_obstacle_along_ray, is_colliding_with_wall, lerp_angle, normalize_angle};
use crate::domain::grid::TileGrid;
use crate::domain::state::Tank;
use crate::domain::tuning::TILE_SIZE;
use crate::domain::tuning::tank::TANK_RADIUS;
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, PI};

/// Heading easing per tick.
pub const HEADING_EASE: f32 = 0.1;

/// How far ahead the wander probe looks for walls.
const LOOKAHEAD: f32 = 2.0 * TANK_RADIUS;

/// Distance of the four cardinal probes used to find the nearest wall.
const PROBE_DISTANCE: f32 = TANK_RADIUS + TILE_SIZE / 2.0;

/// Fraction of a step taken backwards when fully stuck.
const BACKSTEP: f32 = 0.5;

/// Ticks an escape heading is held before wandering resumes.
const ESCAPE_TICKS: u32 = 30;

/// Picks whichever perpendicular to the bullet's path points farther from
/// the bullet, as seen from the tank.
pub fn avoid_bullet(tank: &Tank, bullet_x: f32, bullet_y: f32, bullet_angle: f32) -> f32 {
    let bearing = (bullet_y - tank.y).atan2(bullet_x - tank.x);
    let left = normalize_angle(bullet_angle + FRAC_PI_2);
    let right = normalize_angle(bullet_angle - FRAC_PI_2);
    let left_gap = normalize_angle(left - bearing).abs();
    let right_gap = normalize_angle(right - bearing).abs();
    if left_gap > right_gap { left } else { right }
}

/// Idle wander: keep the current target until the timer runs out or a wall
/// shows up ahead, then jitter it by up to a quarter turn either way.
pub fn wander<R: Rng + ?Sized>(tank: &mut Tank, grid: &TileGrid, rng: &mut R) {
    tank.movement_timer = tank.movement_timer.saturating_sub(1);
    if tank.movement_timer == 0
        || detect_obstacle_along_ray(tank.x, tank.y, tank.angle, LOOKAHEAD, grid)
    {
        tank.target_direction += (rng.r#gen::<f32>() - 0.5) * PI;
        tank.movement_timer = rng.gen_range(60..180);
    }
}

pub fn ease_heading(tank: &mut Tank) {
    tank.angle = normalize_angle(lerp_angle(tank.angle, tank.target_direction, HEADING_EASE));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    Moved,
    Slid,
    Stuck,
}

/// Moves the tank `speed` units along its heading.
///
/// A blocked step falls back to sliding along whichever single axis is
/// free. A fully blocked tank backs off a little and turns its target
/// heading away from the walls its probes touch.
pub fn translate(tank: &mut Tank, speed: f32, grid: &TileGrid) -> Translation {
    if speed <= 0.0 {
        return Translation::Moved;
    }
    let (dx, dy) = (tank.angle.cos() * speed, tank.angle.sin() * speed);

    if !is_colliding_with_wall(tank.x + dx, tank.y + dy, TANK_RADIUS, grid) {
        tank.x += dx;
        tank.y += dy;
        return Translation::Moved;
    }
    if !is_colliding_with_wall(tank.x + dx, tank.y, TANK_RADIUS, grid) {
        tank.x += dx;
        return Translation::Slid;
    }
    if !is_colliding_with_wall(tank.x, tank.y + dy, TANK_RADIUS, grid) {
        tank.y += dy;
        return Translation::Slid;
    }

    let (bx, by) = (tank.x - dx * BACKSTEP, tank.y - dy * BACKSTEP);
    if !is_colliding_with_wall(bx, by, TANK_RADIUS, grid) {
        tank.x = bx;
        tank.y = by;
    }
    match wall_normal(tank.x, tank.y, grid) {
        Some((nx, ny)) => tank.target_direction = ny.atan2(nx),
        None => tank.target_direction = tank.angle + PI,
    }
    tank.movement_timer = ESCAPE_TICKS;
    Translation::Stuck
}

/// Average direction pointing away from every cardinal probe that lands in
/// a wall, or `None` when no probe (or opposing probes only) touch one.
pub fn wall_normal(x: f32, y: f32, grid: &TileGrid) -> Option<(f32, f32)> {
    const CARDINALS: [(f32, f32); 4] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

    let (mut sx, mut sy, mut hits) = (0.0_f32, 0.0_f32, 0);
    for (ox, oy) in CARDINALS {
        let (px, py) = (x + ox * PROBE_DISTANCE, y + oy * PROBE_DISTANCE);
        if is_colliding_with_wall(px, py, 1.0, grid) {
            sx -= ox;
            sy -= oy;
            hits += 1;
        }
    }
    if hits == 0 {
        return None;
    }
    let (nx, ny) = (sx / hits as f32, sy / hits as f32);
    (nx.hypot(ny) > f32::EPSILON).then_some((nx, ny))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::angle_between;
    use crate::domain::state::{EntityId, TankKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bot(x: f32, y: f32, angle: f32) -> Tank {
        let mut tank = Tank::new(EntityId::Bot(1), TankKind::Tier(1), x, y);
        tank.angle = angle;
        tank.target_direction = angle;
        tank
    }

    fn open_room(cols: usize, rows: usize) -> TileGrid {
        let mut grid = TileGrid::filled(rows, cols, 1);
        for row in 1..rows as i32 - 1 {
            for col in 1..cols as i32 - 1 {
                grid.set(col, row, 0);
            }
        }
        grid
    }

    #[test]
    fn when_dodging_then_heading_is_perpendicular_and_away_from_bullet() {
        let tank = bot(200.0, 200.0, 0.0);
        // Bullet below-left of the tank flying right.
        let heading = avoid_bullet(&tank, 150.0, 210.0, 0.0);
        assert!(angle_between(heading, -FRAC_PI_2) < 1e-5);

        // Bullet above-left: dodge downwards.
        let heading = avoid_bullet(&tank, 150.0, 190.0, 0.0);
        assert!(angle_between(heading, FRAC_PI_2) < 1e-5);
    }

    #[test]
    fn when_wander_timer_expires_then_new_target_stays_within_quarter_turn() {
        let grid = open_room(12, 12);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let mut tank = bot(300.0, 300.0, 1.0);
            tank.movement_timer = 1;
            wander(&mut tank, &grid, &mut rng);
            assert!((tank.target_direction - 1.0).abs() <= FRAC_PI_2 + 1e-5);
            assert!((60..180).contains(&tank.movement_timer));
        }
    }

    #[test]
    fn when_path_is_clear_then_wander_keeps_course() {
        let grid = open_room(12, 12);
        let mut rng = StdRng::seed_from_u64(4);
        let mut tank = bot(300.0, 300.0, 0.0);
        tank.movement_timer = 50;
        wander(&mut tank, &grid, &mut rng);
        assert_eq!(tank.target_direction, 0.0);
        assert_eq!(tank.movement_timer, 49);
    }

    #[test]
    fn when_heading_eases_then_it_never_snaps() {
        let mut tank = bot(0.0, 0.0, 0.0);
        tank.target_direction = 1.0;
        ease_heading(&mut tank);
        assert!((tank.angle - 0.1).abs() < 1e-5);
    }

    #[test]
    fn when_diagonal_is_blocked_then_tank_slides_along_free_axis() {
        let grid = open_room(6, 6);
        // Against the right wall (interior ends at x = 250), heading down-right.
        let mut tank = bot(229.0, 125.0, 0.5);
        let outcome = translate(&mut tank, 2.0, &grid);
        assert_eq!(outcome, Translation::Slid);
        assert_eq!(tank.x, 229.0);
        assert!(tank.y > 125.0);
    }

    #[test]
    fn when_wedged_in_corner_then_tank_turns_away_from_walls() {
        let grid = open_room(6, 6);
        // Tucked into the bottom-right corner, heading into it.
        let mut tank = bot(229.0, 229.0, PI / 4.0);
        let outcome = translate(&mut tank, 2.0, &grid);
        assert_eq!(outcome, Translation::Stuck);
        assert!(angle_between(tank.target_direction, -3.0 * PI / 4.0) < 1e-4);
        assert!(tank.x < 229.0 && tank.y < 229.0);
    }

    #[test]
    fn when_no_wall_is_near_then_normal_is_none() {
        let grid = open_room(12, 12);
        assert_eq!(wall_normal(300.0, 300.0, &grid), None);
    }
}
