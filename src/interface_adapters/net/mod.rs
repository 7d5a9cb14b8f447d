pub mod client;

pub use client::{spawn_lobby_serializer, ws_handler};
