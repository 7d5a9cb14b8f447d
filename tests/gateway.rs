mod support;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect() -> Client {
    let (ws, _response) = connect_async(support::ensure_server())
        .await
        .expect("websocket handshake");
    ws
}

async fn send(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string())).await.expect("send frame");
}

/// Reads frames until one of the given type arrives.
async fn next_of_type(ws: &mut Client, kind: &str) -> Value {
    let wait = async {
        loop {
            let frame = ws.next().await.expect("socket open").expect("valid frame");
            let Message::Text(text) = frame else {
                continue;
            };
            let value: Value = serde_json::from_str(&text).expect("server sends json");
            if value["type"] == kind {
                return value;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("no {kind} message within 5s"))
}

async fn create_lobby(ws: &mut Client) -> String {
    send(ws, json!({ "type": "createLobby" })).await;
    let created = next_of_type(ws, "lobbyCreated").await;
    created["data"]["code"].as_str().expect("code is a string").to_string()
}

#[tokio::test]
async fn when_lobby_is_created_then_creator_gets_code_level_and_own_tank() {
    let mut ws = connect().await;
    send(&mut ws, json!({ "type": "setName", "data": "Ada" })).await;

    let code = create_lobby(&mut ws).await;
    assert_eq!(code.len(), 5);
    assert!(code.chars().all(|c| c.is_ascii_uppercase()));

    let level = next_of_type(&mut ws, "updateLevel").await;
    assert_eq!(level["data"]["levelIndex"], 0);
    assert!(level["data"]["grid"].as_array().is_some_and(|rows| !rows.is_empty()));

    let mode = next_of_type(&mut ws, "gameMode").await;
    assert_eq!(mode["data"], "lobby");

    let players = next_of_type(&mut ws, "updatePlayers").await;
    let names: Vec<&str> = players["data"]
        .as_object()
        .expect("players keyed by id")
        .values()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert!(names.contains(&"Ada"));
}

#[tokio::test]
async fn when_code_is_unknown_then_join_is_refused() {
    let mut ws = connect().await;
    send(&mut ws, json!({ "type": "joinLobby", "data": "ZZZZZZZ" })).await;

    let error = next_of_type(&mut ws, "error").await;
    assert_eq!(error["data"]["message"], "Lobby not found");
}

#[tokio::test]
async fn when_second_client_joins_by_code_then_it_is_admitted() {
    let mut host = connect().await;
    let code = create_lobby(&mut host).await;

    let mut guest = connect().await;
    send(&mut guest, json!({ "type": "joinLobby", "data": code.to_lowercase() })).await;
    let joined = next_of_type(&mut guest, "lobbyJoined").await;
    assert_eq!(joined["data"]["code"], code.as_str());

    send(&mut guest, json!({ "type": "createLobby" })).await;
    let error = next_of_type(&mut guest, "error").await;
    assert_eq!(error["data"]["message"], "Already in a lobby");
}

#[tokio::test]
async fn when_ping_is_sent_then_start_time_is_echoed() {
    let mut ws = connect().await;
    send(&mut ws, json!({ "type": "pingCheck", "data": 1234.5 })).await;

    let pong = next_of_type(&mut ws, "pingResponse").await;
    assert_eq!(pong["data"], 1234.5);
}
