use super::simulation::Lobby;
use super::types::{GameEvent, LobbyStatus, LobbyUpdate};
use crate::domain::GameMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

/// Timer periods driving one lobby.
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub tick_interval: Duration,
    /// Period of one transition countdown step.
    pub countdown_step: Duration,
    /// Period between survival waves.
    pub wave_interval: Duration,
}

/// Owns one lobby's simulation and drives it until shutdown is notified.
///
/// Three timers feed the loop: the fixed simulation tick, the one-second
/// countdown that only runs during a transition, and the survival wave
/// timer that only runs in survival.
pub async fn world_task(
    mut lobby: Lobby,
    mut input_rx: mpsc::Receiver<GameEvent>,
    updates_tx: broadcast::Sender<LobbyUpdate>,
    status_tx: watch::Sender<LobbyStatus>,
    timing: LoopTiming,
    shutdown: Arc<Notify>,
) {
    let code = lobby.code().clone();
    let mut tick_timer = tokio::time::interval(timing.tick_interval);
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut countdown: Option<Interval> = None;
    let mut waves: Option<Interval> = None;
    let mut tick: u64 = 0;

    info!(lobby = %code, "lobby world started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = tick_timer.tick() => {
                // Inputs that arrived since the last tick apply before it runs.
                loop {
                    match input_rx.try_recv() {
                        Ok(ev) => lobby.handle_event(ev),
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            debug!(lobby = %code, "input channel closed");
                            break;
                        }
                    }
                }
                lobby.tick();
                tick += 1;
            }
            _ = next_tick(&mut countdown) => {
                lobby.countdown_step();
            }
            _ = next_tick(&mut waves) => {
                lobby.spawn_wave();
            }
        }

        // Timers follow the state the last step left behind.
        sync_timer(&mut countdown, lobby.in_transition(), timing.countdown_step);
        sync_timer(
            &mut waves,
            lobby.mode() == GameMode::Survival && !lobby.in_transition(),
            timing.wave_interval,
        );

        for update in lobby.drain_updates() {
            let _ = updates_tx.send(update);
        }
        status_tx.send_if_modified(|status| {
            let next = lobby.status();
            let changed = *status != next;
            *status = next;
            changed
        });
    }

    info!(lobby = %code, ticks = tick, "lobby world stopped");
}

/// Resolves on the timer's next tick, or never when the timer is off.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Starts a timer whose first tick is one full period away, or stops it.
fn sync_timer(timer: &mut Option<Interval>, wanted: bool, period: Duration) {
    match (wanted, timer.is_some()) {
        (true, false) => {
            let start = tokio::time::Instant::now() + period;
            *timer = Some(tokio::time::interval_at(start, period));
        }
        (false, true) => *timer = None,
        _ => {}
    }
}
