// Procedural open-maze generator for arena and survival levels.

use super::grid::{OPEN, TileGrid};
use super::levels::CHEST_MARKER;
use rand::Rng;
use std::collections::VecDeque;

const BORDER_HEIGHT: i32 = 3;

/// Generates a fully connected open maze.
///
/// Random walls are seeded at `wall_density`, then `corridor_width`-sized
/// blocks are carved on a regular stride, the border is walled off, every
/// open tile outside the largest 4-connected region is filled, and chest
/// markers are sprinkled over the remaining floor at `chest_chance`.
pub fn generate_maze<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    wall_density: f64,
    corridor_width: usize,
    chest_chance: f64,
    rng: &mut R,
) -> TileGrid {
    let mut grid = TileGrid::filled(rows, cols, OPEN);
    let (rows, cols) = (grid.rows() as i32, grid.cols() as i32);
    let corridor = corridor_width.max(1) as i32;

    for row in 0..rows {
        for col in 0..cols {
            if rng.gen_bool(wall_density.clamp(0.0, 1.0)) {
                grid.set(col, row, rng.gen_range(1..=2));
            }
        }
    }

    let stride = (corridor * 2) as usize;
    let carve_chance = (1.0 - wall_density).clamp(0.0, 1.0);
    for row in (1..rows).step_by(stride) {
        for col in (1..cols).step_by(stride) {
            if rng.gen_bool(carve_chance) {
                for r in row..(row + corridor).min(rows) {
                    for c in col..(col + corridor).min(cols) {
                        grid.set(c, r, OPEN);
                    }
                }
            }
        }
    }

    for row in 0..rows {
        grid.set(0, row, BORDER_HEIGHT);
        grid.set(cols - 1, row, BORDER_HEIGHT);
    }
    for col in 0..cols {
        grid.set(col, 0, BORDER_HEIGHT);
        grid.set(col, rows - 1, BORDER_HEIGHT);
    }

    let region = largest_open_region(&grid);
    if region.is_empty() && rows >= 3 && cols >= 3 {
        grid.set(cols / 2, rows / 2, OPEN);
    }
    let mut keep = vec![false; (rows * cols) as usize];
    for (col, row) in &region {
        keep[(row * cols + col) as usize] = true;
    }

    for row in 0..rows {
        for col in 0..cols {
            if grid.get(col, row) != Some(OPEN) {
                continue;
            }
            if !region.is_empty() && !keep[(row * cols + col) as usize] {
                grid.set(col, row, 1);
            } else if rng.gen_bool(chest_chance.clamp(0.0, 1.0)) {
                grid.set(col, row, CHEST_MARKER);
            }
        }
    }

    grid
}

/// Collects the largest 4-connected set of open tiles.
fn largest_open_region(grid: &TileGrid) -> Vec<(i32, i32)> {
    let cols = grid.cols() as i32;
    let mut seen = vec![false; grid.rows() * grid.cols()];
    let mut best: Vec<(i32, i32)> = Vec::new();

    for (col, row, value) in grid.tiles() {
        if value != OPEN || seen[(row * cols + col) as usize] {
            continue;
        }
        let region = flood_fill(grid, col, row, &mut seen, |v| v == OPEN);
        if region.len() > best.len() {
            best = region;
        }
    }
    best
}

/// Breadth-first fill from `(col, row)` over tiles accepted by `passable`.
pub fn flood_fill(
    grid: &TileGrid,
    col: i32,
    row: i32,
    seen: &mut [bool],
    passable: impl Fn(i32) -> bool,
) -> Vec<(i32, i32)> {
    let cols = grid.cols() as i32;
    let mut region = Vec::new();
    let mut queue = VecDeque::from([(col, row)]);
    seen[(row * cols + col) as usize] = true;

    while let Some((c, r)) = queue.pop_front() {
        region.push((c, r));
        for (nc, nr) in [(c + 1, r), (c - 1, r), (c, r + 1), (c, r - 1)] {
            let Some(value) = grid.get(nc, nr) else {
                continue;
            };
            let idx = (nr * cols + nc) as usize;
            if !seen[idx] && passable(value) {
                seen[idx] = true;
                queue.push_back((nc, nr));
            }
        }
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn floor(value: i32) -> bool {
        value <= 0
    }

    #[test]
    fn when_maze_is_generated_then_all_floor_is_connected() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = generate_maze(30, 30, 0.4, 2, 0.02, &mut rng);

            let floor_tiles: Vec<(i32, i32)> = grid
                .tiles()
                .filter(|(_, _, v)| floor(*v))
                .map(|(c, r, _)| (c, r))
                .collect();
            assert!(!floor_tiles.is_empty(), "seed {seed} produced no floor");

            let (c, r) = floor_tiles[0];
            let mut seen = vec![false; grid.rows() * grid.cols()];
            let reached = flood_fill(&grid, c, r, &mut seen, floor);
            assert_eq!(reached.len(), floor_tiles.len(), "seed {seed} left pockets");
        }
    }

    #[test]
    fn when_maze_is_generated_then_border_is_walled() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = generate_maze(12, 18, 0.4, 2, 0.0, &mut rng);
        assert_eq!((grid.rows(), grid.cols()), (12, 18));
        for (col, row, value) in grid.tiles() {
            if col == 0 || row == 0 || col == 17 || row == 11 {
                assert!(value > 0, "border tile ({col},{row}) is open");
            }
        }
    }

    #[test]
    fn when_chest_chance_is_zero_then_no_markers_are_placed() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = generate_maze(20, 20, 0.4, 2, 0.0, &mut rng);
        assert!(grid.tiles().all(|(_, _, v)| v >= 0));
    }

    #[test]
    fn when_chest_chance_is_one_then_every_floor_tile_is_a_chest() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = generate_maze(20, 20, 0.4, 2, 1.0, &mut rng);
        assert!(grid.tiles().all(|(_, _, v)| v != OPEN));
        assert!(grid.tiles().any(|(_, _, v)| v == CHEST_MARKER));
    }

    #[test]
    fn when_grid_is_tiny_then_generation_still_terminates() {
        let mut rng = StdRng::seed_from_u64(1);
        let grid = generate_maze(1, 1, 0.4, 2, 0.02, &mut rng);
        assert_eq!((grid.rows(), grid.cols()), (1, 1));
    }
}
