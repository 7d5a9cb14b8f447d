// Domain-level simulation entities and input types.

use super::tuning::tier::{INERT, TierProfile, tier_profile};
use std::fmt;

/// Stable identity of a tank within a lobby.
///
/// Humans keep their connection-assigned id for the whole session; bots are
/// numbered per level load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Human(u64),
    Bot(u32),
}

impl EntityId {
    pub fn is_ai(self) -> bool {
        matches!(self, EntityId::Bot(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Human(id) => write!(f, "{id}"),
            EntityId::Bot(id) => write!(f, "AI_{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    Lobby,
    Campaign,
    Arena,
    Survival,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Lobby => "lobby",
            GameMode::Campaign => "campaign",
            GameMode::Arena => "arena",
            GameMode::Survival => "survival",
        }
    }
}

/// What a lobby button does when a human shoots it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    StartCampaign,
    ToggleFriendlyFire,
    StartArena,
    StartSurvival,
}

impl ButtonAction {
    /// Button order in the lobby layout, by appearance.
    pub const LAYOUT_ORDER: [ButtonAction; 4] = [
        ButtonAction::StartCampaign,
        ButtonAction::ToggleFriendlyFire,
        ButtonAction::StartArena,
        ButtonAction::StartSurvival,
    ];

    pub fn label(self, friendly_fire: bool) -> &'static str {
        match self {
            ButtonAction::StartCampaign => "Campaign",
            ButtonAction::ToggleFriendlyFire if friendly_fire => "Friendly Fire: ON",
            ButtonAction::ToggleFriendlyFire => "Friendly Fire: OFF",
            ButtonAction::StartArena => "Arena",
            ButtonAction::StartSurvival => "Survival",
        }
    }

    pub fn target_mode(self) -> Option<GameMode> {
        match self {
            ButtonAction::StartCampaign => Some(GameMode::Campaign),
            ButtonAction::StartArena => Some(GameMode::Arena),
            ButtonAction::StartSurvival => Some(GameMode::Survival),
            ButtonAction::ToggleFriendlyFire => None,
        }
    }
}

/// Behaviour/stat selector for a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankKind {
    /// Player-controlled; stats come from buffs, not the tier table.
    Human,
    Tier(u8),
    Button(ButtonAction),
    Chest,
}

impl TankKind {
    pub fn profile(self) -> &'static TierProfile {
        match self {
            TankKind::Tier(tier) => tier_profile(tier),
            TankKind::Human | TankKind::Button(_) | TankKind::Chest => &INERT,
        }
    }

    /// Buttons and chests take no part in combat logic.
    pub fn is_inert(self) -> bool {
        matches!(self, TankKind::Button(_) | TankKind::Chest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuffKind {
    Speed,
    FireRate,
    BulletSpeed,
    BulletBounces,
    Shield,
    MultiShot,
}

impl BuffKind {
    pub const ALL: [BuffKind; 6] = [
        BuffKind::Speed,
        BuffKind::FireRate,
        BuffKind::BulletSpeed,
        BuffKind::BulletBounces,
        BuffKind::Shield,
        BuffKind::MultiShot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BuffKind::Speed => "speed",
            BuffKind::FireRate => "fireRate",
            BuffKind::BulletSpeed => "bulletSpeed",
            BuffKind::BulletBounces => "bulletBounces",
            BuffKind::Shield => "shield",
            BuffKind::MultiShot => "multiShot",
        }
    }
}

/// Accumulated pickup counters. Only ever incremented during a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buffs {
    pub speed: u32,
    pub fire_rate: u32,
    pub bullet_speed: u32,
    pub bullet_bounces: u32,
    pub shield: u32,
    pub multi_shot: u32,
}

impl Buffs {
    pub fn increment(&mut self, kind: BuffKind) {
        let counter = match kind {
            BuffKind::Speed => &mut self.speed,
            BuffKind::FireRate => &mut self.fire_rate,
            BuffKind::BulletSpeed => &mut self.bullet_speed,
            BuffKind::BulletBounces => &mut self.bullet_bounces,
            BuffKind::Shield => &mut self.shield,
            BuffKind::MultiShot => &mut self.multi_shot,
        };
        *counter += 1;
    }
}

/// Stats recomputed from buffs every tick for human tanks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub max_speed: f32,
    pub max_bullets: u32,
    pub fire_cooldown: u32,
    pub bullet_speed: f32,
    pub bullet_bounces: u32,
    pub multi_shot: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementKeys {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub keys: MovementKeys,
    pub turret_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaserPhase {
    #[default]
    Idle,
    Charging {
        ticks_left: u32,
    },
    Firing {
        ticks_left: u32,
    },
    Cooling {
        ticks_left: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Tank {
    pub id: EntityId,
    pub kind: TankKind,
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Hull heading in radians.
    pub angle: f32,
    pub turret_angle: f32,
    pub dead: bool,
    pub shield_charges: u32,
    pub fire_cooldown: u32,

    // Human-only state.
    pub vx: f32,
    pub vy: f32,
    pub pending_input: PlayerInput,
    pub buffs: Buffs,
    pub stats: Option<DerivedStats>,
    pub respawn_timer: u32,

    // AI-only state.
    pub target_direction: f32,
    pub movement_timer: u32,
    pub idle_turret_velocity: f32,
    pub idle_turret_timer: u32,
    pub burst_remaining: u32,
    pub burst_timer: u32,
    pub laser: LaserPhase,
    pub laser_damage_timer: u32,
}

impl Tank {
    pub fn new(id: EntityId, kind: TankKind, x: f32, y: f32) -> Self {
        let shield_charges = u32::from(id.is_ai() && kind.profile().starts_shielded);
        Self {
            id,
            kind,
            name: String::new(),
            x,
            y,
            angle: 0.0,
            turret_angle: 0.0,
            dead: false,
            shield_charges,
            fire_cooldown: 0,
            vx: 0.0,
            vy: 0.0,
            pending_input: PlayerInput::default(),
            buffs: Buffs::default(),
            stats: None,
            respawn_timer: 0,
            target_direction: 0.0,
            movement_timer: 0,
            idle_turret_velocity: 0.0,
            idle_turret_timer: 0,
            burst_remaining: 0,
            burst_timer: 0,
            laser: LaserPhase::Idle,
            laser_damage_timer: 0,
        }
    }

    /// A freshly joined human tank.
    pub fn human(player_id: u64, name: impl Into<String>, x: f32, y: f32) -> Self {
        let mut tank = Self::new(EntityId::Human(player_id), TankKind::Human, x, y);
        tank.name = name.into();
        tank
    }

    pub fn is_ai(&self) -> bool {
        self.id.is_ai()
    }

    pub fn is_alive_human(&self) -> bool {
        !self.is_ai() && !self.dead
    }

    pub fn has_shield(&self) -> bool {
        self.shield_charges > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub id: u64,
    pub owner: EntityId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
    pub bounces: u32,
    /// False until the bullet has cleared its owner's hull or bounced;
    /// an unarmed bullet passes through its owner.
    pub armed: bool,
}

impl Bullet {
    pub fn velocity(&self) -> (f32, f32) {
        (self.angle.cos() * self.speed, self.angle.sin() * self.speed)
    }
}

/// Beam segment published for one or two ticks; recomputed while firing.
#[derive(Debug, Clone, PartialEq)]
pub struct Laser {
    pub owner: EntityId,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub is_active: bool,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drop {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub buff: BuffKind,
    pub ttl: u32,
}
