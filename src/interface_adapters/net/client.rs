use crate::domain::PlayerInput;
use crate::interface_adapters::protocol::{ClientMessage, LobbyCodeDto, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::IdSource;
use crate::use_cases::{GameEvent, LobbyError, LobbyHandle, LobbyRegistry, LobbyUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    LobbyClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn lobby_update_serializer(
    mut updates_rx: broadcast::Receiver<LobbyUpdate>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    latest_level_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each lobby update once and broadcast the shared bytes.
    loop {
        match updates_rx.recv().await {
            Ok(update) => {
                let is_level = matches!(update, LobbyUpdate::Level { .. });
                let msg = ServerMessage::from(update);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize lobby update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Keep the level frame around for lag recovery.
                if is_level {
                    let _ = latest_level_tx.send(bytes.clone());
                }
                let _ = update_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "lobby serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("lobby updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_lobby_serializer(lobby: &LobbyHandle) {
    // Spawn a task that serializes updates for this lobby.
    tokio::spawn(lobby_update_serializer(
        lobby.updates_tx.subscribe(),
        lobby.update_bytes_tx.clone(),
        lobby.latest_level_tx.clone(),
    ));
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let lobby_registry = state.lobby_registry.clone();
    let ids = state.ids.clone();
    ws.on_upgrade(move |socket| {
        // Separate connection id for correlating logs before/after a lobby exists.
        let conn_id = ids.next_id();
        let span = info_span!(
            "conn",
            conn_id,
            player_id = tracing::field::Empty,
            lobby = tracing::field::Empty
        );
        handle_socket(socket, lobby_registry, ids).instrument(span)
    })
}

/// Per-connection traffic counters and log throttles, kept across the
/// unattached and attached phases.
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    // Count lag recovery frames sent to this client.
    lag_recovery_count: u64,

    last_input_full_log: Instant,
    last_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnStats {
    fn new() -> Self {
        let now = Instant::now()
            .checked_sub(LOG_THROTTLE)
            .unwrap_or_else(Instant::now);
        Self {
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_json: 0,
            lag_recovery_count: 0,
            last_input_full_log: now,
            last_lag_log: now,
            last_invalid_input_log: now,
            close_frame: None,
        }
    }

    /// Counts a malformed frame. Returns `Disconnect` once the client has
    /// sent too many.
    fn invalid_message(&mut self, bytes: usize, error: &serde_json::Error) -> LoopControl {
        self.invalid_json += 1;
        if should_log(&mut self.last_invalid_input_log) {
            warn!(bytes, error = %error, "failed to parse client message");
        }
        if self.invalid_json > MAX_INVALID_JSON {
            self.close_frame = Some(CloseFrame {
                code: close_code::POLICY,
                reason: "too many invalid messages".into(),
            });
            return LoopControl::Disconnect;
        }
        LoopControl::Continue
    }
}

/// A connection attached to a lobby with a tank in it.
struct ConnCtx {
    player_id: u64,
    // Lobby code this connection is attached to.
    code: Arc<str>,
    // Registry access for connection lifecycle updates.
    lobby_registry: Arc<LobbyRegistry>,
    input_tx: mpsc::Sender<GameEvent>,
    update_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    latest_level_rx: watch::Receiver<Utf8Bytes>,
}

async fn handle_socket(mut socket: WebSocket, lobby_registry: Arc<LobbyRegistry>, ids: Arc<IdSource>) {
    let mut stats = ConnStats::new();

    let ctx = match pick_lobby(&mut socket, &lobby_registry, &ids, &mut stats).await {
        Ok(Some(ctx)) => ctx,
        Ok(None) => {
            close_socket(&mut socket, &mut stats).await;
            info!(msgs_in = stats.msgs_in, "client disconnected before joining a lobby");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "connection failed before joining a lobby");
            close_socket(&mut socket, &mut stats).await;
            return;
        }
    };

    let span = Span::current();
    span.record("player_id", ctx.player_id);
    span.record("lobby", &*ctx.code);
    info!(player_id = ctx.player_id, lobby = %ctx.code, "client attached");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, ctx, &mut stats).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    // Serialize message safely; log JSON errors instead of panicking
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_counted(
    socket: &mut WebSocket,
    msg: &ServerMessage,
    stats: &mut ConnStats,
) -> Result<(), NetError> {
    let bytes = send_message(socket, msg).await?;
    stats.msgs_out += 1;
    stats.bytes_out += bytes as u64;
    Ok(())
}

async fn close_socket(socket: &mut WebSocket, stats: &mut ConnStats) {
    if let Some(frame) = stats.close_frame.take() {
        let _ = socket.send(Message::Close(Some(frame))).await;
    }
    if let Err(err) = socket.close().await.map_err(NetError::Ws) {
        debug!(error = ?err, "socket close error");
    }
}

/// Unattached phase: serves `createLobby`, `joinLobby`, `setName` and pings
/// until the connection lands in a lobby. `Ok(None)` means the client went
/// away (or was told to) first.
async fn pick_lobby(
    socket: &mut WebSocket,
    lobby_registry: &Arc<LobbyRegistry>,
    ids: &IdSource,
    stats: &mut ConnStats,
) -> Result<Option<ConnCtx>, NetError> {
    // Name requested before joining; applied when the tank is created.
    let mut name = String::new();

    loop {
        let text = match socket.recv().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(_))) => {
                stats.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                return Ok(None);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Err(e)) => {
                warn!(error = %e, "websocket recv error");
                return Ok(None);
            }
        };
        stats.msgs_in += 1;
        stats.bytes_in += text.len() as u64;

        let msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => match stats.invalid_message(text.len(), &e) {
                LoopControl::Continue => continue,
                LoopControl::Disconnect => return Ok(None),
            },
        };

        let (attached, reply) = match msg {
            ClientMessage::CreateLobby => {
                let lobby = lobby_registry.create_lobby().await;
                spawn_lobby_serializer(&lobby);
                (attach(&lobby, lobby_registry, ids, &name).await, CreatedOrJoined::Created)
            }
            ClientMessage::JoinLobby(code) => {
                let attached = match lobby_registry.get_lobby(&code).await {
                    Ok(lobby) => attach(&lobby, lobby_registry, ids, &name).await,
                    Err(e) => Err(e),
                };
                (attached, CreatedOrJoined::Joined)
            }
            ClientMessage::SetName(requested) => {
                name = requested;
                continue;
            }
            ClientMessage::PingCheck(start) => {
                send_counted(socket, &ServerMessage::PingResponse(start), stats).await?;
                continue;
            }
            ClientMessage::PlayerInput(_) | ClientMessage::FireBullet(_) | ClientMessage::FireLaser => {
                if should_log(&mut stats.last_invalid_input_log) {
                    debug!("game input before joining a lobby ignored");
                }
                continue;
            }
        };

        let ctx = match attached {
            Ok(ctx) => ctx,
            Err(e) => {
                info!(reason = ?e, "lobby request rejected");
                send_counted(socket, &ServerMessage::error(e.user_message()), stats).await?;
                continue;
            }
        };

        let code = LobbyCodeDto {
            code: ctx.code.to_string(),
        };
        let confirmation = match reply {
            CreatedOrJoined::Created => ServerMessage::LobbyCreated(code),
            CreatedOrJoined::Joined => ServerMessage::LobbyJoined(code),
        };
        if let Err(e) = send_counted(socket, &confirmation, stats).await {
            // The tank was already spawned; take it back out.
            let _ = disconnect_cleanup(&ctx, stats).await;
            return Err(e);
        }
        return Ok(Some(ctx));
    }
}

enum CreatedOrJoined {
    Created,
    Joined,
}

/// Puts a tank for this connection into `lobby`.
async fn attach(
    lobby: &LobbyHandle,
    lobby_registry: &Arc<LobbyRegistry>,
    ids: &IdSource,
    name: &str,
) -> Result<ConnCtx, LobbyError> {
    // Subscribe to updates *before* joining so the first level frame is not missed.
    let update_bytes_rx = lobby.update_bytes_tx.subscribe();
    let latest_level_rx = lobby.latest_level_tx.subscribe();

    if !lobby.status().accepts_joins() {
        return Err(LobbyError::GameInProgress);
    }
    // Count the connection first so the lobby cannot be torn down under us.
    lobby_registry
        .register_connection(&lobby.code)
        .await
        .ok_or(LobbyError::NotFound)?;

    let player_id = ids.next_id();
    let (reply, reply_rx) = oneshot::channel();
    let join = GameEvent::Join {
        player_id,
        name: name.to_string(),
        reply,
    };
    let joined = match lobby.input_tx.send(join).await {
        Ok(()) => match timeout(JOIN_REPLY_TIMEOUT, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) | Err(_) => Err(LobbyError::Closed),
        },
        Err(_) => Err(LobbyError::Closed),
    };

    if let Err(e) = joined {
        // Compensate in case the join landed after the timeout.
        let _ = lobby.input_tx.try_send(GameEvent::Leave { player_id });
        lobby_registry.register_disconnect(&lobby.code).await;
        return Err(e);
    }

    Ok(ConnCtx {
        player_id,
        code: lobby.code.clone(),
        lobby_registry: lobby_registry.clone(),
        input_tx: lobby.input_tx.clone(),
        update_bytes_rx,
        latest_level_rx,
    })
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_input(mut input: PlayerInput) -> Option<PlayerInput> {
    if !input.turret_angle.is_finite() {
        return None;
    }
    input.turret_angle = input.turret_angle.rem_euclid(std::f32::consts::TAU);
    Some(input)
}

// Shared forwarding for every gameplay event.
fn forward_event(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    stats: &mut ConnStats,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut stats.last_input_full_log) {
                warn!(player_id, "input channel full; dropping event");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, mut ctx: ConnCtx, stats: &mut ConnStats) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, player_id, &ctx.input_tx, stats).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Lobby Update
            update = ctx.update_bytes_rx.recv() => {
                match update {
                    Ok(bytes) => match forward_update_bytes(bytes, socket, stats).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut stats.last_lag_log) {
                            warn!(missed = n, "lobby updates lagged; resending level");
                        }

                        // Resync strategy: resend the level; entity snapshots follow next tick.
                        let latest = ctx.latest_level_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            let bytes_len = latest.len();
                            stats.lag_recovery_count += 1;
                            let outcome = forward_update_bytes(latest, socket, stats).await;
                            debug!(
                                player_id,
                                bytes = bytes_len,
                                count = stats.lag_recovery_count,
                                "sent lag recovery level"
                            );
                            matches!(outcome, LoopControl::Disconnect)
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::LobbyClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            close_socket(socket, stats).await;
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(&ctx, stats).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    stats: &mut ConnStats,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                stats.msgs_in += 1;
                stats.bytes_in += text.len() as u64;

                let msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => return Ok(stats.invalid_message(text.len(), &e)),
                };

                match msg {
                    ClientMessage::CreateLobby | ClientMessage::JoinLobby(_) => {
                        let reply = ServerMessage::error(LobbyError::AlreadyInLobby.user_message());
                        send_counted(socket, &reply, stats).await?;
                        Ok(LoopControl::Continue)
                    }
                    ClientMessage::PingCheck(start) => {
                        send_counted(socket, &ServerMessage::PingResponse(start), stats).await?;
                        Ok(LoopControl::Continue)
                    }
                    ClientMessage::SetName(name) => {
                        forward_event(player_id, input_tx, GameEvent::SetName { player_id, name }, stats)
                    }
                    ClientMessage::PlayerInput(dto) => {
                        let Some(input) = sanitize_input(dto.into()) else {
                            if should_log(&mut stats.last_invalid_input_log) {
                                warn!(player_id, "invalid input values (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };
                        forward_event(player_id, input_tx, GameEvent::Input { player_id, input }, stats)
                    }
                    ClientMessage::FireBullet(fire) => {
                        if !fire.angle.is_finite() {
                            if should_log(&mut stats.last_invalid_input_log) {
                                warn!(player_id, "invalid fire angle; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        }
                        let event = GameEvent::Fire {
                            player_id,
                            angle: fire.angle,
                        };
                        forward_event(player_id, input_tx, event, stats)
                    }
                    ClientMessage::FireLaser => {
                        forward_event(player_id, input_tx, GameEvent::FireLaser { player_id }, stats)
                    }
                }
            }
            Message::Binary(_) => {
                stats.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_update_bytes(bytes: Utf8Bytes, socket: &mut WebSocket, stats: &mut ConnStats) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            stats.msgs_out += 1;
            stats.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send lobby update");
            LoopControl::Disconnect
        }
    }
}

/// Removes the tank and releases the lobby slot. The slot is released even
/// when the world task is already gone.
async fn disconnect_cleanup(ctx: &ConnCtx, stats: &ConnStats) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let left = ctx
        .input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed);

    ctx.lobby_registry.register_disconnect(&ctx.code).await;

    debug!(
        player_id,
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_json = stats.invalid_json,
        lag_recovery_count = stats.lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::MovementKeys;

    #[test]
    fn when_turret_angle_is_not_finite_then_input_is_dropped() {
        let input = PlayerInput {
            keys: MovementKeys::default(),
            turret_angle: f32::NAN,
        };
        assert!(sanitize_input(input).is_none());
    }

    #[test]
    fn when_turret_angle_is_negative_then_it_is_wrapped_into_one_turn() {
        let input = PlayerInput {
            keys: MovementKeys {
                w: true,
                ..MovementKeys::default()
            },
            turret_angle: -std::f32::consts::FRAC_PI_2,
        };
        let sanitized = sanitize_input(input).unwrap();
        assert!(sanitized.keys.w);
        assert!((sanitized.turret_angle - 3.0 * std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn when_log_was_just_emitted_then_next_one_is_throttled() {
        let mut last = Instant::now().checked_sub(LOG_THROTTLE).unwrap();
        assert!(should_log(&mut last));
        assert!(!should_log(&mut last));
    }
}
