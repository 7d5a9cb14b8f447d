// Per-tick simulation systems. Each one is a plain function over the arena.

pub mod ai;
pub mod combat;
pub mod movement;
pub mod pickups;
pub mod projectiles;
