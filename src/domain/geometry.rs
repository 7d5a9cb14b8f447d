// Collision tests and angle helpers shared by every simulation system.

use super::grid::{TileGrid, tile_center, tile_of};
use super::state::Tank;
use super::tuning::TILE_SIZE;
use super::tuning::projectile::BULLET_RADIUS;
use super::tuning::tank::TANK_RADIUS;
use rand::Rng;
use std::f32::consts::{PI, TAU};

/// Tests the four corners of a square of half-width `radius` centred at
/// `(x, y)`. A corner outside the grid or on a wall tile collides.
///
/// Corner sampling misses thin diagonal contacts at high speed; movement and
/// bounce trajectories depend on exactly this behaviour.
pub fn is_colliding_with_wall(x: f32, y: f32, radius: f32, grid: &TileGrid) -> bool {
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (1.0, -1.0)];

    CORNERS.iter().any(|(sx, sy)| {
        let col = tile_of(x + sx * radius);
        let row = tile_of(y + sy * radius);
        match grid.get(col, row) {
            Some(value) => value > 0,
            None => true,
        }
    })
}

/// Axis-aligned box test between a point and a tank widened by `radius`.
/// Dead tanks are never hit.
pub fn is_colliding_with_tank(px: f32, py: f32, tank: &Tank, radius: f32) -> bool {
    if tank.dead {
        return false;
    }
    let half = TANK_RADIUS + radius;
    px > tank.x - half && px < tank.x + half && py > tank.y - half && py < tank.y + half
}

/// Bounds-checked wall lookup; out-of-bounds tiles are not walls.
pub fn is_wall_tile(col: i32, row: i32, grid: &TileGrid) -> bool {
    grid.get(col, row).is_some_and(|value| value > 0)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Interpolates from `current` toward `target` along the shorter arc.
pub fn lerp_angle(current: f32, target: f32, t: f32) -> f32 {
    current + normalize_angle(target - current) * t
}

/// Absolute angular distance, always in `[0, PI]`.
pub fn angle_between(a: f32, b: f32) -> f32 {
    normalize_angle(a - b).abs()
}

/// Picks a random open tile and returns its world-space centre.
///
/// Rejection sampling is capped; after that an open tile is chosen from a
/// full scan, so a grid without open tiles yields `None` instead of spinning.
pub fn random_open_position<R: Rng + ?Sized>(grid: &TileGrid, rng: &mut R) -> Option<(f32, f32)> {
    let attempts = grid.rows() * grid.cols() * 4;
    for _ in 0..attempts {
        let row = rng.gen_range(0..grid.rows()) as i32;
        let col = rng.gen_range(0..grid.cols()) as i32;
        if grid.is_open(col, row) {
            return Some(tile_center(col, row));
        }
    }

    let open: Vec<(i32, i32)> = grid
        .tiles()
        .filter(|(_, _, value)| *value == 0)
        .map(|(col, row, _)| (col, row))
        .collect();
    if open.is_empty() {
        return None;
    }
    let (col, row) = open[rng.gen_range(0..open.len())];
    Some(tile_center(col, row))
}

/// Like [`random_open_position`] but prefers tiles at least `min_distance`
/// away from every point in `avoid`, giving up on the preference after
/// `attempts` samples.
pub fn random_open_position_away<R: Rng + ?Sized>(
    grid: &TileGrid,
    rng: &mut R,
    avoid: &[(f32, f32)],
    min_distance: f32,
    attempts: usize,
) -> Option<(f32, f32)> {
    let min_sq = min_distance * min_distance;
    for _ in 0..attempts {
        let (x, y) = random_open_position(grid, rng)?;
        let clear = avoid.iter().all(|(ax, ay)| {
            let (dx, dy) = (x - ax, y - ay);
            dx * dx + dy * dy >= min_sq
        });
        if clear {
            return Some((x, y));
        }
    }
    random_open_position(grid, rng)
}

/// Marches a ray of length `range` from `(x, y)` in steps no longer than
/// `max_step`, testing a bullet-sized box at each sample.
pub fn ray_hits_wall(x: f32, y: f32, angle: f32, range: f32, max_step: f32, grid: &TileGrid) -> bool {
    if range <= 0.0 {
        return false;
    }
    let steps = (range / max_step).ceil().max(1.0);
    let step = range / steps;
    let (dx, dy) = (angle.cos(), angle.sin());
    (1..=steps as u32).any(|i| {
        let d = step * i as f32;
        is_colliding_with_wall(x + dx * d, y + dy * d, BULLET_RADIUS, grid)
    })
}

/// Forward obstacle probe stepped at tile granularity.
pub fn detect_obstacle_along_ray(x: f32, y: f32, angle: f32, range: f32, grid: &TileGrid) -> bool {
    ray_hits_wall(x, y, angle, range, TILE_SIZE, grid)
}

/// Muzzle check applied before any bullet is created: the point at twice
/// the muzzle offset must not have a wall under any corner of a box of
/// half-width `2 * BULLET_RADIUS`.
pub fn is_muzzle_blocked(x: f32, y: f32, muzzle_dx: f32, muzzle_dy: f32, grid: &TileGrid) -> bool {
    let check_x = x + 2.0 * muzzle_dx;
    let check_y = y + 2.0 * muzzle_dy;
    let size = 2.0 * BULLET_RADIUS;
    let col_left = tile_of(check_x - size);
    let col_right = tile_of(check_x + size);
    let row_top = tile_of(check_y - size);
    let row_bottom = tile_of(check_y + size);

    is_wall_tile(col_left, row_top, grid)
        || is_wall_tile(col_right, row_top, grid)
        || is_wall_tile(col_left, row_bottom, grid)
        || is_wall_tile(col_right, row_bottom, grid)
}
