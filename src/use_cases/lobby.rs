// Lobby orchestration for spawning and managing game worlds.

use crate::domain::levels::{BuiltinLevels, LevelProvider};
use crate::use_cases::game::{LoopTiming, world_task};
use crate::use_cases::simulation::{Lobby, LobbyOptions};
use crate::use_cases::{GameEvent, LobbyStatus, LobbyUpdate};
use axum::extract::ws::Utf8Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Length of a lobby join code.
pub const CODE_LEN: usize = 5;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone, Copy)]
pub struct LobbySettings {
    /// Capacity for inbound player events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast lobby updates.
    pub broadcast_capacity: usize,
    pub timing: LoopTiming,
    pub options: LobbyOptions,
}

/// Errors returned by lobby operations; each maps to a message for the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyError {
    NotFound,
    /// The lobby left the waiting room; new players cannot enter.
    GameInProgress,
    /// The connection is already attached to a lobby.
    AlreadyInLobby,
    /// The world task stopped before answering.
    Closed,
}

impl LobbyError {
    pub fn user_message(self) -> &'static str {
        match self {
            LobbyError::NotFound => "Lobby not found",
            LobbyError::GameInProgress => "Game already in progress",
            LobbyError::AlreadyInLobby => "Already in a lobby",
            LobbyError::Closed => "Lobby closed",
        }
    }
}

/// Per-lobby channels.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Join code clients use to target this lobby.
    pub code: Arc<str>,
    /// Sender for game events into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw lobby updates.
    pub updates_tx: broadcast::Sender<LobbyUpdate>,
    /// Broadcast sender for serialized lobby updates.
    pub update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Watch sender holding the latest serialized level frame.
    pub latest_level_tx: watch::Sender<Utf8Bytes>,
    /// Watch sender for coarse lobby state.
    pub status_tx: watch::Sender<LobbyStatus>,
    shutdown: Arc<Notify>,
}

impl LobbyHandle {
    pub fn status(&self) -> LobbyStatus {
        *self.status_tx.borrow()
    }
}

struct LobbyEntry {
    handle: LobbyHandle,
    /// Attached connections; the lobby is removed when this drops to zero.
    connections: usize,
}

/// Thread-safe registry for active lobbies.
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    levels: Arc<dyn LevelProvider>,
    /// Map of lobby code to active lobby.
    lobbies: RwLock<HashMap<String, LobbyEntry>>,
}

impl LobbyRegistry {
    /// Creates a registry serving the built-in level set.
    pub fn new(settings: LobbySettings) -> Self {
        Self::with_levels(settings, Arc::new(BuiltinLevels::default()))
    }

    pub fn with_levels(settings: LobbySettings, levels: Arc<dyn LevelProvider>) -> Self {
        Self {
            settings,
            levels,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new lobby under a fresh code and spawns its world task.
    pub async fn create_lobby(&self) -> LobbyHandle {
        let mut lobbies = self.lobbies.write().await;
        let code = loop {
            let candidate = random_code(&mut rand::thread_rng());
            if !lobbies.contains_key(&candidate) {
                break candidate;
            }
        };
        let code: Arc<str> = Arc::from(code);

        let lobby = Lobby::new(
            code.clone(),
            self.levels.clone(),
            StdRng::from_entropy(),
            self.settings.options,
        );

        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (updates_tx, _updates_rx) = broadcast::channel::<LobbyUpdate>(self.settings.broadcast_capacity);
        let (update_bytes_tx, _update_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.broadcast_capacity);
        let (latest_level_tx, _latest_level_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (status_tx, _status_rx) = watch::channel::<LobbyStatus>(lobby.status());
        let shutdown = Arc::new(Notify::new());

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(world_task(
            lobby,
            input_rx,
            updates_tx.clone(),
            status_tx.clone(),
            self.settings.timing,
            shutdown.clone(),
        ));

        let handle = LobbyHandle {
            code: code.clone(),
            input_tx,
            updates_tx,
            update_bytes_tx,
            latest_level_tx,
            status_tx,
            shutdown,
        };
        lobbies.insert(
            code.to_string(),
            LobbyEntry {
                handle: handle.clone(),
                connections: 0,
            },
        );
        info!(lobby = %code, lobbies = lobbies.len(), "lobby created");
        handle
    }

    /// Looks a lobby up by a user-typed code.
    pub async fn get_lobby(&self, code: &str) -> Result<LobbyHandle, LobbyError> {
        let code = normalize_code(code);
        let lobbies = self.lobbies.read().await;
        lobbies
            .get(&code)
            .map(|entry| entry.handle.clone())
            .ok_or(LobbyError::NotFound)
    }

    /// Counts an attached connection. Returns `None` if the lobby is gone.
    pub async fn register_connection(&self, code: &str) -> Option<usize> {
        let mut lobbies = self.lobbies.write().await;
        let entry = lobbies.get_mut(code)?;
        entry.connections += 1;
        Some(entry.connections)
    }

    /// Releases an attached connection; the last one out tears the lobby
    /// down and stops its world task.
    pub async fn register_disconnect(&self, code: &str) {
        let mut lobbies = self.lobbies.write().await;
        let Some(entry) = lobbies.get_mut(code) else {
            return;
        };
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections > 0 {
            return;
        }
        if let Some(entry) = lobbies.remove(code) {
            entry.handle.shutdown.notify_one();
            info!(lobby = %code, lobbies = lobbies.len(), "lobby removed");
        }
    }

    pub async fn lobby_count(&self) -> usize {
        self.lobbies.read().await.len()
    }
}

/// Join codes are matched case-insensitively and ignore surrounding space.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN).map(|_| char::from(rng.gen_range(b'A'..=b'Z'))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry() -> LobbyRegistry {
        LobbyRegistry::new(LobbySettings {
            input_channel_capacity: 16,
            broadcast_capacity: 64,
            timing: LoopTiming {
                tick_interval: Duration::from_millis(16),
                countdown_step: Duration::from_secs(1),
                wave_interval: Duration::from_secs(10),
            },
            options: LobbyOptions::default(),
        })
    }

    #[test]
    fn when_code_is_generated_then_it_is_five_uppercase_letters() {
        let code = random_code(&mut StdRng::seed_from_u64(4));
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn when_code_is_typed_loosely_then_lobby_is_still_found() {
        let registry = registry();
        let lobby = registry.create_lobby().await;
        let typed = format!("  {}  ", lobby.code.to_ascii_lowercase());

        let found = registry.get_lobby(&typed).await.unwrap();
        assert_eq!(found.code, lobby.code);
        assert!(matches!(
            registry.get_lobby("ZZZZZZ").await,
            Err(LobbyError::NotFound)
        ));
    }

    #[tokio::test]
    async fn when_last_connection_leaves_then_lobby_is_removed_and_world_stops() {
        let registry = registry();
        let lobby = registry.create_lobby().await;
        assert_eq!(registry.register_connection(&lobby.code).await, Some(1));
        assert_eq!(registry.register_connection(&lobby.code).await, Some(2));

        registry.register_disconnect(&lobby.code).await;
        assert_eq!(registry.lobby_count().await, 1);

        registry.register_disconnect(&lobby.code).await;
        assert_eq!(registry.lobby_count().await, 0);
        assert!(registry.register_connection(&lobby.code).await.is_none());
        tokio::time::timeout(Duration::from_secs(1), lobby.input_tx.closed())
            .await
            .unwrap();
    }

    #[test]
    fn when_errors_are_shown_then_messages_are_user_facing() {
        assert_eq!(LobbyError::NotFound.user_message(), "Lobby not found");
        assert_eq!(LobbyError::GameInProgress.user_message(), "Game already in progress");
    }
}
