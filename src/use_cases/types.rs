// Use-case level inputs/outputs for the lobby loop.

use super::lobby::LobbyError;
use crate::domain::state::{Buffs, Bullet, Drop, EntityId, GameMode, Laser, LaserPhase, PlayerInput, Tank, TankKind};
use crate::domain::{Explosion, TileGrid};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum GameEvent {
    /// Adds a human tank. The reply carries the admission decision.
    Join {
        player_id: u64,
        name: String,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    Leave {
        player_id: u64,
    },
    Input {
        player_id: u64,
        input: PlayerInput,
    },
    Fire {
        player_id: u64,
        angle: f32,
    },
    FireLaser {
        player_id: u64,
    },
    SetName {
        player_id: u64,
        name: String,
    },
}

/// Everything a lobby broadcasts to its room.
#[derive(Debug, Clone)]
pub enum LobbyUpdate {
    Players(Vec<TankSnapshot>),
    Bullets(Vec<Bullet>),
    Lasers(Vec<Laser>),
    Drops(Vec<Drop>),
    Level { grid: TileGrid, level_index: usize },
    Explosion(Explosion),
    Mode(GameMode),
    LevelComplete { level_number: usize },
    Victory,
    GameOver,
    TransitionTimer { seconds_left: u32 },
    NextLevel,
}

/// Coarse lobby state for admission checks and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyStatus {
    pub mode: GameMode,
    pub in_transition: bool,
    pub humans: usize,
}

impl LobbyStatus {
    /// New players may only enter the waiting room.
    pub fn accepts_joins(&self) -> bool {
        self.mode == GameMode::Lobby
    }
}

/// Read-only view of one tank as broadcast to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct TankSnapshot {
    pub id: EntityId,
    pub kind: TankKind,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub turret_angle: f32,
    pub dead: bool,
    pub shield_charges: u32,
    pub buffs: Buffs,
    pub laser_firing: bool,
}

impl From<&Tank> for TankSnapshot {
    fn from(tank: &Tank) -> Self {
        Self {
            id: tank.id,
            kind: tank.kind,
            name: tank.name.clone(),
            x: tank.x,
            y: tank.y,
            angle: tank.angle,
            turret_angle: tank.turret_angle,
            dead: tank.dead,
            shield_charges: tank.shield_charges,
            buffs: tank.buffs,
            laser_firing: matches!(tank.laser, LaserPhase::Firing { .. }),
        }
    }
}
