// Gameplay tuning: fixed numbers shared by the simulation systems.

pub mod projectile;
pub mod tank;
pub mod tier;

/// Edge length of one grid tile in world units.
pub const TILE_SIZE: f32 = 50.0;

/// Fixed simulation rate; every per-tick quantity below assumes it.
pub const TICKS_PER_SECOND: u32 = 60;

/// All gameplay tuning a lobby carries, bundled for injection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameTuning {
    pub tank: tank::TankTuning,
    pub laser: projectile::LaserTuning,
    pub drops: projectile::DropTuning,
}
