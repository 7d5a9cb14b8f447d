// Use cases layer: lobby lifecycle and the per-lobby simulation loop.

pub mod game;
pub mod lobby;
pub mod simulation;
pub mod types;

pub use game::LoopTiming;
pub use lobby::{LobbyError, LobbyHandle, LobbyRegistry, LobbySettings};
pub use simulation::{Lobby, LobbyOptions};
pub use types::{GameEvent, LobbyStatus, LobbyUpdate, TankSnapshot};
