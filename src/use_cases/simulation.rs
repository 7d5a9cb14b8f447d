// The lobby state machine: one running simulation with its mode, level and
// transition countdown. Synchronous and transport-free; the world task owns
// one of these and drives it from timers and inbound events.

use super::lobby::LobbyError;
use super::types::{GameEvent, LobbyStatus, LobbyUpdate, TankSnapshot};
use crate::domain::events::SimEvent;
use crate::domain::geometry::{random_open_position, random_open_position_away};
use crate::domain::levels::LevelProvider;
use crate::domain::state::{ButtonAction, EntityId, GameMode, LaserPhase, PlayerInput, Tank, TankKind};
use crate::domain::systems::ai::{self, laser};
use crate::domain::systems::combat::{CombatRules, HitReport, spawn_drop};
use crate::domain::systems::projectiles::{self, Muzzle, Shot};
use crate::domain::systems::{movement, pickups};
use crate::domain::tuning::tier::MAX_TIER;
use crate::domain::tuning::{GameTuning, TILE_SIZE};
use crate::domain::world::Arena;
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info};

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 16;
const DEFAULT_NAME: &str = "Player";

/// Minimum distance between players placed on a generated maze.
const SPAWN_SEPARATION: f32 = 5.0 * TILE_SIZE;
const SPAWN_ATTEMPTS: usize = 20;

/// Most bots a single survival wave adds.
const MAX_WAVE_SIZE: usize = 8;

/// Per-lobby knobs that come from runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct LobbyOptions {
    pub tuning: GameTuning,
    pub player_laser_enabled: bool,
    /// Length of the countdown between levels, in seconds.
    pub transition_seconds: u32,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            tuning: GameTuning::default(),
            player_laser_enabled: false,
            transition_seconds: 3,
        }
    }
}

/// Pending level change. While set, ticks are skipped and only the
/// countdown advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: GameMode,
    pub level_index: usize,
    pub seconds_left: u32,
}

/// Named phases of one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    /// Bullets move, bounce, clash and hit.
    Projectiles,
    /// Published beam segments age; player beams advance.
    Lasers,
    /// Bots react to this tick's bullet positions.
    Ai,
    /// Human input and lobby respawns.
    Movement,
    /// Drop pickup, drop expiry and stat refresh.
    Pickups,
    EndConditions,
    /// Snapshots of the fully resolved tick.
    Broadcast,
}

pub const TICK_ORDER: [TickStage; 7] = [
    TickStage::Projectiles,
    TickStage::Lasers,
    TickStage::Ai,
    TickStage::Movement,
    TickStage::Pickups,
    TickStage::EndConditions,
    TickStage::Broadcast,
];

/// Trims a requested name and caps it, falling back to a default.
pub fn sanitize_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}

pub struct Lobby {
    code: Arc<str>,
    mode: GameMode,
    level_index: usize,
    arena: Arena,
    spawn: (f32, f32),
    friendly_fire: bool,
    transition: Option<Transition>,
    survival_kills: u32,
    wave: u32,
    arena_started_with: usize,
    levels: Arc<dyn LevelProvider>,
    rng: StdRng,
    options: LobbyOptions,
    events: Vec<SimEvent>,
    outbox: Vec<LobbyUpdate>,
    drops_dirty: bool,
}

impl Lobby {
    /// Creates a lobby sitting in the waiting room with its first layout
    /// loaded.
    pub fn new(code: Arc<str>, levels: Arc<dyn LevelProvider>, rng: StdRng, options: LobbyOptions) -> Self {
        let mut lobby = Self {
            code,
            mode: GameMode::Lobby,
            level_index: 0,
            arena: Arena::new(crate::domain::grid::TileGrid::degenerate()),
            spawn: (0.0, 0.0),
            friendly_fire: false,
            transition: None,
            survival_kills: 0,
            wave: 0,
            arena_started_with: 0,
            levels,
            rng,
            options,
            events: Vec::new(),
            outbox: Vec::new(),
            drops_dirty: false,
        };
        lobby.load_level();
        lobby.outbox.clear();
        lobby
    }

    pub fn code(&self) -> &Arc<str> {
        &self.code
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn friendly_fire(&self) -> bool {
        self.friendly_fire
    }

    pub fn transition(&self) -> Option<Transition> {
        self.transition
    }

    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn status(&self) -> LobbyStatus {
        LobbyStatus {
            mode: self.mode,
            in_transition: self.in_transition(),
            humans: self.arena.human_count(),
        }
    }

    fn rules(&self) -> CombatRules {
        CombatRules {
            mode: self.mode,
            friendly_fire: self.friendly_fire,
        }
    }

    /// Takes everything queued for broadcast since the last call.
    pub fn drain_updates(&mut self) -> Vec<LobbyUpdate> {
        std::mem::take(&mut self.outbox)
    }

    /// Applies one inbound gateway event.
    pub fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Join { player_id, name, reply } => {
                let result = self.join(player_id, &name);
                let _ = reply.send(result);
            }
            GameEvent::Leave { player_id } => self.leave(player_id),
            GameEvent::Input { player_id, input } => self.set_input(player_id, input),
            GameEvent::Fire { player_id, angle } => {
                self.fire_bullet(player_id, angle);
            }
            GameEvent::FireLaser { player_id } => {
                self.fire_laser(player_id);
            }
            GameEvent::SetName { player_id, name } => self.set_name(player_id, &name),
        }
    }

    /// Adds a human tank at the spawn point. Only the waiting room admits
    /// new players.
    pub fn join(&mut self, player_id: u64, name: &str) -> Result<(), LobbyError> {
        if self.mode != GameMode::Lobby {
            return Err(LobbyError::GameInProgress);
        }
        let id = EntityId::Human(player_id);
        if !self.arena.tanks.contains_key(&id) {
            let (x, y) = self.spawn;
            let mut tank = Tank::human(player_id, sanitize_name(name), x, y);
            tank.stats = Some(pickups::derive_stats(&tank.buffs, self.mode, &self.options.tuning.tank));
            self.arena.tanks.insert(id, tank);
            info!(lobby = %self.code, player_id, "player joined");
        }

        // Bring the newcomer up to date; everyone else gets a harmless repeat.
        self.outbox.push(LobbyUpdate::Level {
            grid: self.arena.grid.clone(),
            level_index: self.level_index,
        });
        self.outbox.push(LobbyUpdate::Mode(self.mode));
        self.drops_dirty = true;
        Ok(())
    }

    pub fn leave(&mut self, player_id: u64) {
        let id = EntityId::Human(player_id);
        if self.arena.tanks.remove(&id).is_some() {
            self.arena.bullets.retain(|b| b.owner != id);
            info!(lobby = %self.code, player_id, "player left");
        }
    }

    /// Stores movement input; it takes effect on the next tick.
    pub fn set_input(&mut self, player_id: u64, input: PlayerInput) {
        if let Some(tank) = self.arena.tanks.get_mut(&EntityId::Human(player_id)) {
            tank.pending_input = input;
        }
    }

    pub fn set_name(&mut self, player_id: u64, name: &str) {
        if let Some(tank) = self.arena.tanks.get_mut(&EntityId::Human(player_id)) {
            tank.name = sanitize_name(name);
        }
    }

    /// Fires the player's volley. Survival enforces the fire-rate cooldown,
    /// every other mode the live-bullet cap. Returns bullets created.
    pub fn fire_bullet(&mut self, player_id: u64, angle: f32) -> usize {
        if self.in_transition() || !angle.is_finite() {
            return 0;
        }
        let Some(tank) = self.arena.tanks.get(&EntityId::Human(player_id)) else {
            return 0;
        };
        if tank.dead {
            return 0;
        }
        let stats = tank
            .stats
            .unwrap_or_else(|| pickups::derive_stats(&tank.buffs, self.mode, &self.options.tuning.tank));
        let survival = self.mode == GameMode::Survival;
        if survival && tank.fire_cooldown > 0 {
            return 0;
        }

        let muzzle = Muzzle::of_human(tank);
        let shot = Shot {
            angle,
            speed: stats.bullet_speed,
            bounces: stats.bullet_bounces,
            count: 1 + stats.multi_shot,
            max_bullets: (!survival).then_some(stats.max_bullets),
        };
        let fired = projectiles::fire(&mut self.arena, muzzle, shot);
        if survival && fired > 0 {
            if let Some(tank) = self.arena.tanks.get_mut(&EntityId::Human(player_id)) {
                tank.fire_cooldown = stats.fire_cooldown;
            }
        }
        fired
    }

    /// Starts a player beam when the server allows it.
    pub fn fire_laser(&mut self, player_id: u64) -> bool {
        if !self.options.player_laser_enabled || self.in_transition() {
            return false;
        }
        let laser_tuning = self.options.tuning.laser;
        self.arena
            .tanks
            .get_mut(&EntityId::Human(player_id))
            .is_some_and(|tank| laser::fire_player_laser(tank, &laser_tuning))
    }

    /// Runs one simulation step. Does nothing while a transition is pending.
    pub fn tick(&mut self) {
        if self.in_transition() {
            return;
        }
        for stage in TICK_ORDER {
            self.run_stage(stage);
        }
    }

    pub fn run_stage(&mut self, stage: TickStage) {
        let rules = self.rules();
        let tuning = self.options.tuning;
        let mut report = HitReport::default();

        match stage {
            TickStage::Projectiles => {
                projectiles::tick_bullets(
                    &mut self.arena,
                    rules,
                    &tuning.drops,
                    &mut self.rng,
                    &mut self.events,
                    &mut report,
                );
            }
            TickStage::Lasers => {
                laser::prune_lasers(&mut self.arena);
                laser::tick_player_lasers(
                    &mut self.arena,
                    &tuning.laser,
                    rules,
                    &tuning.drops,
                    &mut self.rng,
                    &mut self.events,
                    &mut report,
                );
            }
            TickStage::Ai => {
                if self.mode != GameMode::Arena {
                    ai::update_ai_tanks(
                        &mut self.arena,
                        rules,
                        &tuning.laser,
                        &tuning.drops,
                        &mut self.rng,
                        &mut self.events,
                        &mut report,
                    );
                }
            }
            TickStage::Movement => {
                if self.mode == GameMode::Lobby {
                    self.respawn_humans();
                }
                movement::move_humans(&mut self.arena, &tuning.tank);
            }
            TickStage::Pickups => {
                let collected = pickups::collect_drops(&mut self.arena, &tuning.drops);
                let expired = pickups::age_drops(&mut self.arena);
                self.drops_dirty |= collected || expired;
                pickups::refresh_stats(&mut self.arena, self.mode, &tuning.tank);
            }
            TickStage::EndConditions => self.check_end_conditions(),
            TickStage::Broadcast => self.publish_snapshots(),
        }

        self.react(report);
    }

    /// Mode bookkeeping for hits resolved during a stage.
    fn react(&mut self, report: HitReport) {
        self.drops_dirty |= report.drops_changed;

        for action in report.buttons {
            match action {
                ButtonAction::ToggleFriendlyFire => self.toggle_friendly_fire(),
                _ => {
                    if let Some(target) = action.target_mode() {
                        if self.mode == GameMode::Lobby && !self.in_transition() {
                            self.begin_transition(target, 0);
                        }
                    }
                }
            }
        }

        for kill in report.kills {
            match kill.victim {
                EntityId::Human(_) => {
                    if self.mode == GameMode::Lobby {
                        if let Some(tank) = self.arena.tanks.get_mut(&kill.victim) {
                            tank.respawn_timer = self.options.tuning.tank.lobby_respawn_ticks;
                        }
                    }
                }
                EntityId::Bot(_) => {
                    if self.mode != GameMode::Survival || kill.victim_kind == TankKind::Chest {
                        continue;
                    }
                    let Some(bot) = self.arena.tanks.remove(&kill.victim) else {
                        continue;
                    };
                    if kill.killer.is_ai() {
                        continue;
                    }
                    self.survival_kills += 1;
                    let every = self.options.tuning.drops.survival_kills_per_drop.max(1);
                    if self.survival_kills % every == 0 {
                        spawn_drop(&mut self.arena, bot.x, bot.y, &self.options.tuning.drops, &mut self.rng);
                        self.drops_dirty = true;
                    }
                }
            }
        }
    }

    fn toggle_friendly_fire(&mut self) {
        self.friendly_fire = !self.friendly_fire;
        let label = ButtonAction::ToggleFriendlyFire.label(self.friendly_fire);
        for tank in self.arena.tanks.values_mut() {
            if tank.kind == TankKind::Button(ButtonAction::ToggleFriendlyFire) {
                tank.name = label.to_string();
            }
        }
        info!(lobby = %self.code, friendly_fire = self.friendly_fire, "friendly fire toggled");
    }

    fn respawn_humans(&mut self) {
        let spawn = self.spawn;
        for tank in self.arena.tanks.values_mut().filter(|t| !t.is_ai() && t.dead) {
            tank.respawn_timer = tank.respawn_timer.saturating_sub(1);
            if tank.respawn_timer == 0 {
                revive(tank, spawn);
            }
        }
    }

    fn check_end_conditions(&mut self) {
        if self.in_transition() {
            return;
        }
        let humans = self.arena.human_count();
        let living = self.arena.living_humans();

        match self.mode {
            GameMode::Lobby => {}
            GameMode::Campaign => {
                if humans > 0 && living == 0 {
                    self.game_over();
                } else if !self.arena.tanks.values().any(|t| t.is_ai() && !t.kind.is_inert() && !t.dead) {
                    self.level_complete();
                }
            }
            GameMode::Survival => {
                if humans > 0 && living == 0 {
                    self.game_over();
                }
            }
            GameMode::Arena => {
                let last_standing = usize::from(self.arena_started_with > 1);
                if humans > 0 && living <= last_standing {
                    self.game_over();
                }
            }
        }
    }

    fn level_complete(&mut self) {
        let level_number = self.level_index + 1;
        self.outbox.push(LobbyUpdate::LevelComplete { level_number });
        info!(lobby = %self.code, level = level_number, "level complete");

        let next = self.level_index + 1;
        if next < self.levels.level_count(GameMode::Campaign) {
            self.begin_transition(GameMode::Campaign, next);
        } else {
            self.outbox.push(LobbyUpdate::Victory);
            info!(lobby = %self.code, "campaign won");
            self.begin_transition(GameMode::Lobby, 0);
        }
    }

    fn game_over(&mut self) {
        self.outbox.push(LobbyUpdate::GameOver);
        info!(lobby = %self.code, mode = self.mode.as_str(), "game over");
        self.begin_transition(GameMode::Lobby, 0);
    }

    /// Freezes the simulation and starts the countdown to `target`.
    pub fn begin_transition(&mut self, target: GameMode, level_index: usize) {
        let seconds_left = self.options.transition_seconds;
        self.transition = Some(Transition {
            target,
            level_index,
            seconds_left,
        });
        self.outbox.push(LobbyUpdate::TransitionTimer { seconds_left });
        debug!(lobby = %self.code, target = target.as_str(), level_index, "transition started");
    }

    /// One second of countdown. At zero the pending level loads.
    pub fn countdown_step(&mut self) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        transition.seconds_left = transition.seconds_left.saturating_sub(1);
        if transition.seconds_left > 0 {
            let seconds_left = transition.seconds_left;
            self.outbox.push(LobbyUpdate::TransitionTimer { seconds_left });
            return;
        }
        let Transition {
            target, level_index, ..
        } = *transition;
        self.transition = None;
        self.start_mode(target, level_index);
        self.outbox.push(LobbyUpdate::NextLevel);
    }

    fn start_mode(&mut self, mode: GameMode, level_index: usize) {
        let previous = self.mode;
        self.mode = mode;
        self.level_index = level_index;

        if mode != previous {
            info!(lobby = %self.code, from = previous.as_str(), to = mode.as_str(), "mode changed");
        }
        match mode {
            GameMode::Lobby => {
                for tank in self.arena.tanks.values_mut().filter(|t| !t.is_ai()) {
                    tank.buffs = Default::default();
                }
            }
            GameMode::Arena => self.arena_started_with = self.arena.human_count(),
            GameMode::Survival => {
                self.wave = 0;
                self.survival_kills = 0;
            }
            GameMode::Campaign => {}
        }

        self.load_level();
        if mode == GameMode::Survival {
            self.spawn_wave();
        }
    }

    /// Loads the current mode's level, then places and resets every human.
    fn load_level(&mut self) {
        let humans = self.arena.human_count();
        let level = self
            .levels
            .load_level(self.mode, self.level_index, humans, self.friendly_fire, &mut self.rng);
        self.arena.reset(level.grid, level.bots);
        self.spawn = level.spawn;

        if self.mode == GameMode::Campaign
            && self.rng.gen_bool(self.options.tuning.drops.campaign_chest_chance.clamp(0.0, 1.0))
        {
            if let Some((x, y)) = random_open_position(&self.arena.grid, &mut self.rng) {
                let id = self.arena.next_bot_id();
                self.arena.tanks.insert(id, Tank::new(id, TankKind::Chest, x, y));
            }
        }

        let ids: Vec<EntityId> = self.arena.humans().map(|t| t.id).collect();
        let mut placed: Vec<(f32, f32)> = Vec::with_capacity(ids.len());
        for id in ids {
            let position = match self.mode {
                GameMode::Lobby | GameMode::Campaign => self.spawn,
                GameMode::Arena | GameMode::Survival => random_open_position_away(
                    &self.arena.grid,
                    &mut self.rng,
                    &placed,
                    SPAWN_SEPARATION,
                    SPAWN_ATTEMPTS,
                )
                .unwrap_or(self.spawn),
            };
            placed.push(position);
            if let Some(tank) = self.arena.tanks.get_mut(&id) {
                revive(tank, position);
            }
        }
        pickups::refresh_stats(&mut self.arena, self.mode, &self.options.tuning.tank);

        self.drops_dirty = true;
        self.outbox.push(LobbyUpdate::Level {
            grid: self.arena.grid.clone(),
            level_index: self.level_index,
        });
        self.outbox.push(LobbyUpdate::Mode(self.mode));
        info!(
            lobby = %self.code,
            mode = self.mode.as_str(),
            level = self.level_index + 1,
            bots = self.arena.tanks.len() - self.arena.human_count(),
            "level loaded"
        );
    }

    /// Adds a survival wave and raises the tier ceiling. Does nothing
    /// outside survival or during a transition.
    pub fn spawn_wave(&mut self) {
        if self.mode != GameMode::Survival || self.in_transition() {
            return;
        }
        self.wave += 1;
        let ceiling = self.tier_ceiling();
        let humans: Vec<(f32, f32)> = self.arena.humans().map(|t| (t.x, t.y)).collect();
        let count = (humans.len().max(1) + self.wave as usize / 2).min(MAX_WAVE_SIZE);

        for _ in 0..count {
            let Some((x, y)) =
                random_open_position_away(&self.arena.grid, &mut self.rng, &humans, SPAWN_SEPARATION, SPAWN_ATTEMPTS)
            else {
                break;
            };
            let tier = self.rng.gen_range(0..=ceiling);
            let id = self.arena.next_bot_id();
            let mut bot = Tank::new(id, TankKind::Tier(tier), x, y);
            bot.angle = self.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
            bot.target_direction = bot.angle;
            bot.turret_angle = bot.angle;
            self.arena.tanks.insert(id, bot);
        }
        info!(lobby = %self.code, wave = self.wave, ceiling, count, "survival wave spawned");
    }

    /// Highest tier the next survival wave may contain.
    pub fn tier_ceiling(&self) -> u8 {
        u8::try_from(self.wave).unwrap_or(MAX_TIER).min(MAX_TIER)
    }

    fn publish_snapshots(&mut self) {
        for event in self.events.drain(..) {
            match event {
                SimEvent::Explosion(explosion) => self.outbox.push(LobbyUpdate::Explosion(explosion)),
            }
        }
        self.outbox.push(LobbyUpdate::Players(
            self.arena.tanks.values().map(TankSnapshot::from).collect(),
        ));
        self.outbox.push(LobbyUpdate::Bullets(self.arena.bullets.clone()));
        self.outbox.push(LobbyUpdate::Lasers(self.arena.lasers.clone()));
        if std::mem::take(&mut self.drops_dirty) {
            self.outbox.push(LobbyUpdate::Drops(self.arena.drops.clone()));
        }
    }
}

/// Puts a human back into play at `position` with a clean slate, keeping
/// buffs. Shield charges are restored from the shield buff.
fn revive(tank: &mut Tank, (x, y): (f32, f32)) {
    tank.x = x;
    tank.y = y;
    tank.vx = 0.0;
    tank.vy = 0.0;
    tank.dead = false;
    tank.respawn_timer = 0;
    tank.fire_cooldown = 0;
    tank.laser = LaserPhase::Idle;
    tank.shield_charges = tank.buffs.shield;
}
