// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::IdSource;
use crate::use_cases::{LobbyOptions, LobbyRegistry, LobbySettings, LoopTiming};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();
    // Start the Web Server
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::new(config::http_host(), config::http_port());

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let options = LobbyOptions {
        player_laser_enabled: config::player_laser_enabled(),
        transition_seconds: config::TRANSITION_SECONDS,
        ..LobbyOptions::default()
    };
    tracing::debug!(
        player_laser_enabled = options.player_laser_enabled,
        "lobby options configured"
    );

    // Lobbies are created on demand by clients; the registry starts empty.
    let lobby_registry = Arc::new(LobbyRegistry::new(LobbySettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        broadcast_capacity: config::BROADCAST_CAPACITY,
        timing: LoopTiming {
            tick_interval: config::TICK_INTERVAL,
            countdown_step: config::COUNTDOWN_STEP,
            wave_interval: config::WAVE_INTERVAL,
        },
        options,
    }));

    Arc::new(AppState {
        lobby_registry,
        ids: Arc::new(IdSource::new(&mut rand::thread_rng())),
    })
}
