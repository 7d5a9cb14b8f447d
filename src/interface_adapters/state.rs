use crate::interface_adapters::utils::rng::IdSource;
use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Active lobbies, keyed by join code.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Connection and player ids.
    pub ids: Arc<IdSource>,
}
