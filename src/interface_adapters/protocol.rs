// Wire protocol DTOs and conversions for the public WebSocket.
//
// Every frame is a JSON object `{"type": <event>, "data": <payload>}`; events
// without a payload omit `data`.

use crate::domain::state::{Buffs, Bullet, Drop, EntityId, Laser, MovementKeys, PlayerInput, TankKind};
use crate::domain::Explosion;
use crate::use_cases::{LobbyUpdate, TankSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateLobby,
    // Lobby code as typed by the user.
    JoinLobby(String),
    SetName(String),
    PlayerInput(PlayerInputDto),
    FireBullet(FireBulletDto),
    FireLaser,
    // Client timestamp echoed back untouched.
    PingCheck(f64),
}

/// Level-triggered movement state plus turret aim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInputDto {
    #[serde(default)]
    pub keys: KeysDto,
    #[serde(default)]
    pub turret_angle: f32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct KeysDto {
    #[serde(default)]
    pub w: bool,
    #[serde(default)]
    pub a: bool,
    #[serde(default)]
    pub s: bool,
    #[serde(default)]
    pub d: bool,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        let KeysDto { w, a, s, d } = input.keys;
        Self {
            keys: MovementKeys { w, a, s, d },
            turret_angle: input.turret_angle,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FireBulletDto {
    pub angle: f32,
}

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    LobbyCreated(LobbyCodeDto),
    LobbyJoined(LobbyCodeDto),
    Error(ErrorDto),
    PingResponse(f64),
    // Every tank keyed by its wire id.
    UpdatePlayers(BTreeMap<String, PlayerDto>),
    UpdateBullets(Vec<BulletDto>),
    UpdateLasers(Vec<LaserDto>),
    UpdateDrops(Vec<DropDto>),
    UpdateLevel(LevelDto),
    Explosion(ExplosionDto),
    GameMode(&'static str),
    LevelComplete(LevelCompleteDto),
    Victory,
    GameOver,
    TransitionTimer(TransitionTimerDto),
    NextLevel,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorDto {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyCodeDto {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDto {
    pub message: String,
}

/// Tier as the client renders it: a number for combat bots, a tag for
/// players, buttons and chests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TierDto {
    Level(u8),
    Tag(&'static str),
}

impl From<TankKind> for TierDto {
    fn from(kind: TankKind) -> Self {
        match kind {
            TankKind::Human => TierDto::Tag("player"),
            TankKind::Tier(tier) => TierDto::Level(tier),
            TankKind::Button(_) => TierDto::Tag("button"),
            TankKind::Chest => TierDto::Tag("chest"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffsDto {
    pub speed: u32,
    pub fire_rate: u32,
    pub bullet_speed: u32,
    pub bullet_bounces: u32,
    pub shield: u32,
    pub multi_shot: u32,
}

impl From<Buffs> for BuffsDto {
    fn from(buffs: Buffs) -> Self {
        Self {
            speed: buffs.speed,
            fire_rate: buffs.fire_rate,
            bullet_speed: buffs.bullet_speed,
            bullet_bounces: buffs.bullet_bounces,
            shield: buffs.shield,
            multi_shot: buffs.multi_shot,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub turret_angle: f32,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    pub tier: TierDto,
    pub is_dead: bool,
    pub shield: bool,
    pub shield_charges: u32,
    pub multi_shot: u32,
    pub buffs: BuffsDto,
    pub laser_active: bool,
}

impl From<&TankSnapshot> for PlayerDto {
    fn from(tank: &TankSnapshot) -> Self {
        Self {
            id: wire_id(tank.id, tank.kind),
            name: tank.name.clone(),
            x: tank.x,
            y: tank.y,
            angle: tank.angle,
            turret_angle: tank.turret_angle,
            is_ai: tank.id.is_ai(),
            tier: tank.kind.into(),
            is_dead: tank.dead,
            shield: tank.shield_charges > 0,
            shield_charges: tank.shield_charges,
            multi_shot: tank.buffs.multi_shot,
            buffs: tank.buffs.into(),
            laser_active: tank.laser_firing,
        }
    }
}

/// Identifier clients key tanks by. Chests carry their own prefix so the
/// client can tell them apart without the tier field.
pub fn wire_id(id: EntityId, kind: TankKind) -> String {
    match (id, kind) {
        (EntityId::Bot(n), TankKind::Chest) => format!("AI_c{n}"),
        _ => id.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BulletDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub owner: String,
}

impl From<&Bullet> for BulletDto {
    fn from(bullet: &Bullet) -> Self {
        Self {
            id: bullet.id,
            x: bullet.x,
            y: bullet.y,
            owner: bullet.owner.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaserDto {
    pub owner: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub is_active: bool,
}

impl From<&Laser> for LaserDto {
    fn from(laser: &Laser) -> Self {
        Self {
            owner: laser.owner.to_string(),
            x1: laser.x1,
            y1: laser.y1,
            x2: laser.x2,
            y2: laser.y2,
            is_active: laser.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DropDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub buff: &'static str,
}

impl From<&Drop> for DropDto {
    fn from(drop: &Drop) -> Self {
        Self {
            id: drop.id,
            x: drop.x,
            y: drop.y,
            buff: drop.buff.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDto {
    pub grid: Vec<Vec<i32>>,
    pub level_index: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExplosionDto {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub size: f32,
}

impl From<Explosion> for ExplosionDto {
    fn from(e: Explosion) -> Self {
        Self {
            x: e.x,
            y: e.y,
            z: e.z,
            size: e.size,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCompleteDto {
    pub level_number: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionTimerDto {
    pub seconds_left: u32,
}

impl From<LobbyUpdate> for ServerMessage {
    fn from(update: LobbyUpdate) -> Self {
        match update {
            LobbyUpdate::Players(tanks) => ServerMessage::UpdatePlayers(
                tanks
                    .iter()
                    .map(PlayerDto::from)
                    .map(|dto| (dto.id.clone(), dto))
                    .collect(),
            ),
            LobbyUpdate::Bullets(bullets) => ServerMessage::UpdateBullets(bullets.iter().map(BulletDto::from).collect()),
            LobbyUpdate::Lasers(lasers) => ServerMessage::UpdateLasers(lasers.iter().map(LaserDto::from).collect()),
            LobbyUpdate::Drops(drops) => ServerMessage::UpdateDrops(drops.iter().map(DropDto::from).collect()),
            LobbyUpdate::Level { grid, level_index } => ServerMessage::UpdateLevel(LevelDto {
                grid: grid.to_rows(),
                level_index,
            }),
            LobbyUpdate::Explosion(explosion) => ServerMessage::Explosion(explosion.into()),
            LobbyUpdate::Mode(mode) => ServerMessage::GameMode(mode.as_str()),
            LobbyUpdate::LevelComplete { level_number } => {
                ServerMessage::LevelComplete(LevelCompleteDto { level_number })
            }
            LobbyUpdate::Victory => ServerMessage::Victory,
            LobbyUpdate::GameOver => ServerMessage::GameOver,
            LobbyUpdate::TransitionTimer { seconds_left } => {
                ServerMessage::TransitionTimer(TransitionTimerDto { seconds_left })
            }
            LobbyUpdate::NextLevel => ServerMessage::NextLevel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GameMode;
    use crate::domain::state::{ButtonAction, Tank};
    use serde_json::{Value, json};

    fn to_json(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn when_client_sends_input_then_keys_and_turret_are_parsed() {
        let raw = r#"{"type":"playerInput","data":{"keys":{"w":true,"d":true},"turretAngle":1.5}}"#;
        let ClientMessage::PlayerInput(dto) = serde_json::from_str(raw).unwrap() else {
            panic!("expected playerInput");
        };
        let input = PlayerInput::from(dto);
        assert!(input.keys.w && input.keys.d && !input.keys.a);
        assert_eq!(input.turret_angle, 1.5);
    }

    #[test]
    fn when_client_sends_payloadless_events_then_they_parse() {
        assert!(matches!(
            serde_json::from_str(r#"{"type":"createLobby"}"#),
            Ok(ClientMessage::CreateLobby)
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"type":"fireLaser"}"#),
            Ok(ClientMessage::FireLaser)
        ));
        assert!(matches!(
            serde_json::from_str(r#"{"type":"joinLobby","data":"abcde"}"#),
            Ok(ClientMessage::JoinLobby(code)) if code == "abcde"
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn when_server_events_are_serialized_then_they_use_type_and_data() {
        assert_eq!(to_json(&ServerMessage::Victory), json!({"type": "victory"}));
        assert_eq!(
            to_json(&LobbyUpdate::TransitionTimer { seconds_left: 2 }.into()),
            json!({"type": "transitionTimer", "data": {"secondsLeft": 2}})
        );
        assert_eq!(
            to_json(&LobbyUpdate::Mode(GameMode::Survival).into()),
            json!({"type": "gameMode", "data": "survival"})
        );
        assert_eq!(
            to_json(&ServerMessage::error("Lobby not found")),
            json!({"type": "error", "data": {"message": "Lobby not found"}})
        );
    }

    #[test]
    fn when_tanks_are_snapshotted_then_ids_and_tiers_follow_wire_rules() {
        let mut human = Tank::human(42, "Ada", 10.0, 20.0);
        human.shield_charges = 1;
        let chest = Tank::new(EntityId::Bot(3), TankKind::Chest, 0.0, 0.0);
        let button = Tank::new(
            EntityId::Bot(4),
            TankKind::Button(ButtonAction::StartArena),
            0.0,
            0.0,
        );
        let bot = Tank::new(EntityId::Bot(5), TankKind::Tier(6), 0.0, 0.0);
        let tanks = [human, chest, button, bot];
        let update = LobbyUpdate::Players(tanks.iter().map(TankSnapshot::from).collect());

        let value = to_json(&update.into());
        let data = &value["data"];
        assert_eq!(data["42"]["isAI"], json!(false));
        assert_eq!(data["42"]["shield"], json!(true));
        assert_eq!(data["42"]["turretAngle"], json!(0.0));
        assert_eq!(data["42"]["tier"], json!("player"));
        assert_eq!(data["AI_c3"]["tier"], json!("chest"));
        assert_eq!(data["AI_4"]["tier"], json!("button"));
        assert_eq!(data["AI_5"]["tier"], json!(6));
        assert_eq!(data["AI_5"]["isAI"], json!(true));
    }
}
