// Rectangular tile grid backing every level.

use super::tuning::TILE_SIZE;

/// Tile value for open floor.
pub const OPEN: i32 = 0;

/// Row-major grid of tile values: 0 is open, positive values are walls of
/// that height, negative values are spawn markers until the level loader
/// normalises them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

impl TileGrid {
    /// Builds a grid from rows; `None` when empty or ragged.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Option<Self> {
        let cols = rows.first()?.len();
        if cols == 0 || rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let row_count = rows.len();
        Some(Self {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn filled(rows: usize, cols: usize, value: i32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    /// Single open tile used when level data is unusable.
    pub fn degenerate() -> Self {
        Self::filled(1, 1, OPEN)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.cols && row < self.rows).then(|| row * self.cols + col)
    }

    /// Tile value, or `None` out of bounds.
    pub fn get(&self, col: i32, row: i32) -> Option<i32> {
        self.index(col, row).map(|i| self.cells[i])
    }

    /// Writes a tile; out-of-bounds writes are ignored.
    pub fn set(&mut self, col: i32, row: i32, value: i32) {
        if let Some(i) = self.index(col, row) {
            self.cells[i] = value;
        }
    }

    pub fn is_open(&self, col: i32, row: i32) -> bool {
        self.get(col, row) == Some(OPEN)
    }

    pub fn open_tile_count(&self) -> usize {
        self.cells.iter().filter(|v| **v == OPEN).count()
    }

    /// Iterates `(col, row, value)` in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        self.cells.iter().enumerate().map(|(i, v)| {
            let col = (i % self.cols) as i32;
            let row = (i / self.cols) as i32;
            (col, row, *v)
        })
    }

    /// Copies the grid back into nested rows for the wire.
    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        self.cells.chunks(self.cols).map(<[i32]>::to_vec).collect()
    }

    /// World-space size as `(width, height)`.
    pub fn world_size(&self) -> (f32, f32) {
        (
            self.cols as f32 * TILE_SIZE,
            self.rows as f32 * TILE_SIZE,
        )
    }
}

/// Tile coordinate containing a world coordinate.
pub fn tile_of(world: f32) -> i32 {
    (world / TILE_SIZE).floor() as i32
}

/// World-space centre of a tile.
pub fn tile_center(col: i32, row: i32) -> (f32, f32) {
    (
        col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_rows_are_ragged_then_grid_is_rejected() {
        assert!(TileGrid::from_rows(vec![vec![0, 0], vec![0]]).is_none());
        assert!(TileGrid::from_rows(vec![]).is_none());
        assert!(TileGrid::from_rows(vec![vec![]]).is_none());
    }

    #[test]
    fn when_grid_is_built_then_lookups_are_row_major() {
        let grid = TileGrid::from_rows(vec![vec![0, 1, 2], vec![3, 0, 0]]).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 3);
        assert_eq!(grid.get(2, 0), Some(2));
        assert_eq!(grid.get(0, 1), Some(3));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(-1, 0), None);
        assert_eq!(grid.to_rows(), vec![vec![0, 1, 2], vec![3, 0, 0]]);
    }

    #[test]
    fn when_converting_coordinates_then_tile_centres_round_trip() {
        let (x, y) = tile_center(3, 4);
        assert_eq!((x, y), (175.0, 225.0));
        assert_eq!((tile_of(x), tile_of(y)), (3, 4));
        assert_eq!(tile_of(-0.5), -1);
    }
}
