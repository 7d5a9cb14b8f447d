// Level provider: built-in text layouts for the lobby and campaign, generated
// mazes for arena and survival.
//
// Text format: one row per line, blank lines separate levels. Digits are wall
// heights (0 is open floor). Letters are markers encoded as `'A' - ch - 1`,
// so `A..H` spawn bots of tier 0..7, `S` marks the player spawn, `Y` a chest
// and `Z` a lobby button.

use super::grid::{OPEN, TileGrid, tile_center};
use super::maze::generate_maze;
use super::state::{ButtonAction, EntityId, GameMode, Tank, TankKind};
use super::tuning::tier::MAX_TIER;
use rand::{Rng, RngCore};
use std::f32::consts::TAU;

pub const SPAWN_MARKER: i32 = marker('S');
pub const CHEST_MARKER: i32 = marker('Y');
pub const BUTTON_MARKER: i32 = marker('Z');

const SPAWN_TIER: i32 = 18;
const CHEST_TIER: i32 = 24;
const BUTTON_TIER: i32 = 25;

const LOBBY_LEVELS: &str = include_str!("../../levels/lobby.txt");
const CAMPAIGN_LEVELS: &str = include_str!("../../levels/campaign.txt");

/// Maze parameters for generated modes.
const MAZE_WALL_DENSITY: f64 = 0.4;
const MAZE_CORRIDOR_WIDTH: usize = 2;
const MAZE_CHEST_CHANCE: f64 = 0.02;

/// Marker value stored in the grid for a letter.
pub const fn marker(ch: char) -> i32 {
    'A' as i32 - ch as i32 - 1
}

/// A level ready to simulate: markers already resolved to bots and a spawn.
#[derive(Debug, Clone)]
pub struct LoadedLevel {
    pub grid: TileGrid,
    pub bots: Vec<Tank>,
    pub spawn: (f32, f32),
}

impl LoadedLevel {
    /// Stand-in for unusable level data: one open tile and no bots.
    pub fn degenerate() -> Self {
        Self {
            grid: TileGrid::degenerate(),
            bots: Vec::new(),
            spawn: tile_center(0, 0),
        }
    }
}

/// Source of level layouts for each game mode.
pub trait LevelProvider: Send + Sync {
    /// Loads level `index` of `mode`. `human_count` sizes generated mazes;
    /// `friendly_fire` labels the lobby toggle button.
    fn load_level(
        &self,
        mode: GameMode,
        index: usize,
        human_count: usize,
        friendly_fire: bool,
        rng: &mut dyn RngCore,
    ) -> LoadedLevel;

    /// Number of discrete levels; generated modes report 1.
    fn level_count(&self, mode: GameMode) -> usize;
}

/// Layouts compiled into the binary plus maze generation.
#[derive(Debug, Clone)]
pub struct BuiltinLevels {
    lobby: Vec<Vec<Vec<i32>>>,
    campaign: Vec<Vec<Vec<i32>>>,
}

impl Default for BuiltinLevels {
    fn default() -> Self {
        Self {
            lobby: parse_levels(LOBBY_LEVELS),
            campaign: parse_levels(CAMPAIGN_LEVELS),
        }
    }
}

impl BuiltinLevels {
    pub fn from_text(lobby: &str, campaign: &str) -> Self {
        Self {
            lobby: parse_levels(lobby),
            campaign: parse_levels(campaign),
        }
    }
}

impl LevelProvider for BuiltinLevels {
    fn load_level(
        &self,
        mode: GameMode,
        index: usize,
        human_count: usize,
        friendly_fire: bool,
        rng: &mut dyn RngCore,
    ) -> LoadedLevel {
        let rows = match mode {
            GameMode::Lobby => self.lobby.get(index).or_else(|| self.lobby.first()).cloned(),
            GameMode::Campaign => self.campaign.get(index).cloned(),
            GameMode::Arena | GameMode::Survival => {
                let size = maze_size(human_count);
                let maze = generate_maze(
                    size,
                    size,
                    MAZE_WALL_DENSITY,
                    MAZE_CORRIDOR_WIDTH,
                    MAZE_CHEST_CHANCE,
                    rng,
                );
                Some(maze.to_rows())
            }
        };

        match rows.and_then(TileGrid::from_rows) {
            Some(grid) => populate(grid, friendly_fire, rng),
            None => LoadedLevel::degenerate(),
        }
    }

    fn level_count(&self, mode: GameMode) -> usize {
        match mode {
            GameMode::Lobby => self.lobby.len(),
            GameMode::Campaign => self.campaign.len(),
            GameMode::Arena | GameMode::Survival => 1,
        }
    }
}

/// Side length of a generated maze for `humans` players.
pub fn maze_size(humans: usize) -> usize {
    let scaled = 30.0 * (humans.max(1) as f64).sqrt();
    (scaled.floor() as usize).max(1)
}

/// Splits level text into raw rows. Ragged levels are kept as-is and
/// rejected when loaded.
pub fn parse_levels(text: &str) -> Vec<Vec<Vec<i32>>> {
    let mut levels = Vec::new();
    let mut current: Vec<Vec<i32>> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                levels.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(line.chars().map(tile_value).collect());
    }
    if !current.is_empty() {
        levels.push(current);
    }
    levels
}

fn tile_value(ch: char) -> i32 {
    match ch.to_digit(10) {
        Some(height) => height as i32,
        None => marker(ch),
    }
}

/// Resolves every negative marker into a bot or the spawn point and clears
/// the tile.
fn populate(mut grid: TileGrid, friendly_fire: bool, rng: &mut dyn RngCore) -> LoadedLevel {
    let markers: Vec<(i32, i32, i32)> = grid.tiles().filter(|(_, _, v)| *v < 0).collect();

    let mut spawn = None;
    let mut bots = Vec::new();
    let mut next_id: u32 = 0;
    let mut buttons = ButtonAction::LAYOUT_ORDER.iter();

    for (col, row, value) in markers {
        grid.set(col, row, OPEN);
        let (x, y) = tile_center(col, row);
        let kind = match -value - 1 {
            SPAWN_TIER => {
                spawn = Some((x, y));
                continue;
            }
            CHEST_TIER => TankKind::Chest,
            BUTTON_TIER => match buttons.next() {
                Some(action) => TankKind::Button(*action),
                None => continue,
            },
            tier => TankKind::Tier(tier.clamp(0, i32::from(MAX_TIER)) as u8),
        };

        let mut bot = Tank::new(EntityId::Bot(next_id), kind, x, y);
        next_id += 1;
        if let TankKind::Button(action) = kind {
            bot.name = action.label(friendly_fire).to_string();
        } else if !kind.is_inert() {
            bot.angle = rng.r#gen::<f32>() * TAU;
            bot.target_direction = bot.angle;
            bot.turret_angle = bot.angle;
        }
        bots.push(bot);
    }

    LoadedLevel {
        spawn: spawn.unwrap_or_else(|| tile_center(grid.cols() as i32 / 2, grid.rows() as i32 / 2)),
        grid,
        bots,
    }
}
