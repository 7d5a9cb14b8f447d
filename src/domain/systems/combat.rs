// Hit resolution shared by bullets and beams: who may damage whom, shields,
// and what a kill leaves behind.

use crate::domain::events::EventSink;
use crate::domain::state::{BuffKind, ButtonAction, Drop, EntityId, GameMode, TankKind};
use crate::domain::tuning::projectile::{DropTuning, EXPLOSION_Z};
use crate::domain::world::Arena;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

const KILL_EXPLOSION_SIZE: f32 = 40.0;
const SHIELD_EXPLOSION_SIZE: f32 = 15.0;

/// Damage policy of the lobby's current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatRules {
    pub mode: GameMode,
    pub friendly_fire: bool,
}

impl CombatRules {
    /// Human-on-human damage: always on in the lobby and the arena, behind the
    /// friendly-fire flag in the cooperative modes.
    pub fn allows_player_damage(&self) -> bool {
        match self.mode {
            GameMode::Lobby | GameMode::Arena => true,
            GameMode::Campaign | GameMode::Survival => self.friendly_fire,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub victim: EntityId,
    pub victim_kind: TankKind,
    pub killer: EntityId,
}

/// What the lobby has to react to after a damage pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitReport {
    pub kills: Vec<Kill>,
    pub buttons: Vec<ButtonAction>,
    /// Set when a drop was created, so the lobby republishes the list.
    pub drops_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// The victim took no damage (immune or already dead).
    Ignored,
    ShieldAbsorbed,
    Killed,
    Pressed,
}

/// Applies one hit from `shooter` to `victim`. Missing victims are ignored.
#[allow(clippy::too_many_arguments)]
pub fn apply_hit<R: Rng + ?Sized>(
    arena: &mut Arena,
    shooter: EntityId,
    victim: EntityId,
    rules: CombatRules,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) -> HitOutcome {
    let Some(tank) = arena.tanks.get_mut(&victim) else {
        return HitOutcome::Ignored;
    };
    if tank.dead {
        return HitOutcome::Ignored;
    }

    match tank.kind {
        TankKind::Button(action) => {
            // Only players press buttons.
            if shooter.is_ai() {
                return HitOutcome::Ignored;
            }
            report.buttons.push(action);
            if action.target_mode().is_some() {
                tank.dead = true;
                events.explosion(tank.x, tank.y, EXPLOSION_Z, KILL_EXPLOSION_SIZE);
            }
            return HitOutcome::Pressed;
        }
        TankKind::Chest => {}
        TankKind::Human | TankKind::Tier(_) => {
            let immune = match (shooter.is_ai(), victim.is_ai()) {
                (true, true) => true,
                (false, false) => shooter != victim && !rules.allows_player_damage(),
                _ => false,
            };
            if immune {
                return HitOutcome::Ignored;
            }
        }
    }

    let (x, y, kind) = (tank.x, tank.y, tank.kind);
    if tank.shield_charges > 0 {
        tank.shield_charges -= 1;
        events.explosion(x, y, EXPLOSION_Z, SHIELD_EXPLOSION_SIZE);
        return HitOutcome::ShieldAbsorbed;
    }

    tank.dead = true;
    events.explosion(x, y, EXPLOSION_Z, KILL_EXPLOSION_SIZE);
    debug!(victim = %victim, killer = %shooter, "tank destroyed");
    report.kills.push(Kill {
        victim,
        victim_kind: kind,
        killer: shooter,
    });

    if kind == TankKind::Chest {
        spawn_drop(arena, x, y, drops, rng);
        report.drops_changed = true;
    }
    HitOutcome::Killed
}

/// Places a drop with a random buff at `(x, y)`.
pub fn spawn_drop<R: Rng + ?Sized>(
    arena: &mut Arena,
    x: f32,
    y: f32,
    drops: &DropTuning,
    rng: &mut R,
) {
    let buff = BuffKind::ALL.choose(rng).copied().unwrap_or(BuffKind::Speed);
    let id = arena.next_drop_id();
    arena.drops.push(Drop {
        id,
        x,
        y,
        buff,
        ttl: drops.lifetime_ticks,
    });
}
