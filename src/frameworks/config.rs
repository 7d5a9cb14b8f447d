use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn http_host() -> IpAddr {
    env::var("GAME_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Whether humans may fire the charged laser.
pub fn player_laser_enabled() -> bool {
    env::var("PLAYER_LASER_ENABLED")
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const BROADCAST_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
pub const TRANSITION_SECONDS: u32 = 3;
pub const WAVE_INTERVAL: Duration = Duration::from_secs(10);
