// Entity collections of one running level.

use super::grid::TileGrid;
use super::state::{Bullet, Drop, EntityId, Laser, Tank};
use std::collections::BTreeMap;

/// Everything the systems mutate during a tick.
///
/// Tanks are keyed by id in a `BTreeMap` so every pass over them runs in the
/// same order, which keeps seeded simulations reproducible.
#[derive(Debug, Clone)]
pub struct Arena {
    pub grid: TileGrid,
    pub tanks: BTreeMap<EntityId, Tank>,
    pub bullets: Vec<Bullet>,
    pub lasers: Vec<Laser>,
    pub drops: Vec<Drop>,
    next_bullet_id: u64,
    next_drop_id: u64,
    next_bot_id: u32,
}

impl Arena {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            tanks: BTreeMap::new(),
            bullets: Vec::new(),
            lasers: Vec::new(),
            drops: Vec::new(),
            next_bullet_id: 1,
            next_drop_id: 1,
            next_bot_id: 0,
        }
    }

    /// Swaps in a new level: bots are replaced, humans are kept as they are,
    /// and every transient collection is cleared.
    pub fn reset(&mut self, grid: TileGrid, bots: Vec<Tank>) {
        self.grid = grid;
        self.tanks.retain(|id, _| !id.is_ai());
        self.bullets.clear();
        self.lasers.clear();
        self.drops.clear();
        self.next_bot_id = 0;
        for bot in bots {
            if let EntityId::Bot(n) = bot.id {
                self.next_bot_id = self.next_bot_id.max(n + 1);
            }
            self.tanks.insert(bot.id, bot);
        }
    }

    pub fn next_bullet_id(&mut self) -> u64 {
        let id = self.next_bullet_id;
        self.next_bullet_id += 1;
        id
    }

    pub fn next_drop_id(&mut self) -> u64 {
        let id = self.next_drop_id;
        self.next_drop_id += 1;
        id
    }

    /// Fresh bot id that does not collide with any bot from the level file.
    pub fn next_bot_id(&mut self) -> EntityId {
        let id = self.next_bot_id;
        self.next_bot_id += 1;
        EntityId::Bot(id)
    }

    pub fn bullets_owned_by(&self, owner: EntityId) -> usize {
        self.bullets.iter().filter(|b| b.owner == owner).count()
    }

    pub fn humans(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values().filter(|t| !t.is_ai())
    }

    pub fn human_count(&self) -> usize {
        self.humans().count()
    }

    pub fn living_humans(&self) -> usize {
        self.humans().filter(|t| !t.dead).count()
    }
}
