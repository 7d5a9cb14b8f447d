// Domain layer: core simulation types and rules.

pub mod events;
pub mod geometry;
pub mod grid;
pub mod levels;
pub mod maze;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod world;

pub use events::{EventSink, Explosion, SimEvent};
pub use grid::TileGrid;
pub use levels::{BuiltinLevels, LevelProvider, LoadedLevel};
pub use state::{Bullet, Drop, EntityId, GameMode, Laser, PlayerInput, Tank, TankKind};
pub use world::Arena;
