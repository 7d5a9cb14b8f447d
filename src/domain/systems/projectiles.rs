use super::combat::{CombatRules, HitReport, apply_hit};
use crate::domain::events::EventSink;
use crate::domain::geometry::{is_colliding_with_tank, is_colliding_with_wall, is_muzzle_blocked};
use crate::domain::state::{Bullet, EntityId, Tank};
use crate::domain::tuning::projectile::{BULLET_RADIUS, DropTuning, EXPLOSION_Z, MUZZLE_OFFSET_SCALE, SPREAD_ANGLE};
use crate::domain::tuning::tank::TANK_RADIUS;
use crate::domain::world::Arena;
use rand::Rng;
use std::collections::HashSet;
use std::f32::consts::PI;

const WALL_EXPLOSION_SIZE: f32 = 10.0;
const CLASH_EXPLOSION_SIZE: f32 = 12.0;

/// Where a shot leaves from: the shooter's position and hull motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Muzzle {
    pub owner: EntityId,
    pub x: f32,
    pub y: f32,
    pub hull_angle: f32,
    pub hull_speed: f32,
}

impl Muzzle {
    /// Muzzle of a human tank, carried along by its current velocity.
    pub fn of_human(tank: &Tank) -> Self {
        Self {
            owner: tank.id,
            x: tank.x,
            y: tank.y,
            hull_angle: tank.angle,
            hull_speed: tank.vx.hypot(tank.vy),
        }
    }

    /// Muzzle of a bot, carried along at its tier's cruise speed.
    pub fn of_bot(tank: &Tank) -> Self {
        Self {
            owner: tank.id,
            x: tank.x,
            y: tank.y,
            hull_angle: tank.angle,
            hull_speed: tank.kind.profile().move_speed,
        }
    }
}

/// One trigger pull. `count` bullets fan out around `angle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub angle: f32,
    pub speed: f32,
    pub bounces: u32,
    pub count: u32,
    /// Live-bullet cap, checked for every bullet of the volley; `None` means
    /// uncapped.
    pub max_bullets: Option<u32>,
}

/// Offset from the tank centre to where a bullet heading `angle` appears.
pub fn muzzle_offset(muzzle: &Muzzle, angle: f32) -> (f32, f32) {
    let barrel = MUZZLE_OFFSET_SCALE * (TANK_RADIUS + BULLET_RADIUS);
    (
        barrel * angle.cos() + muzzle.hull_speed * muzzle.hull_angle.cos(),
        barrel * angle.sin() + muzzle.hull_speed * muzzle.hull_angle.sin(),
    )
}

/// Fires a volley and returns how many bullets were created. Barrels whose
/// muzzle sits in a wall are skipped silently.
pub fn fire(arena: &mut Arena, muzzle: Muzzle, shot: Shot) -> usize {
    let mid = (shot.count.max(1) - 1) as f32 / 2.0;
    let mut fired = 0;
    for barrel in 0..shot.count.max(1) {
        if let Some(cap) = shot.max_bullets {
            if arena.bullets_owned_by(muzzle.owner) >= cap as usize {
                break;
            }
        }
        let angle = shot.angle + (barrel as f32 - mid) * SPREAD_ANGLE;
        let (dx, dy) = muzzle_offset(&muzzle, angle);
        if is_muzzle_blocked(muzzle.x, muzzle.y, dx, dy, &arena.grid) {
            continue;
        }
        let id = arena.next_bullet_id();
        arena.bullets.push(Bullet {
            id,
            owner: muzzle.owner,
            x: muzzle.x + dx,
            y: muzzle.y + dy,
            angle,
            speed: shot.speed,
            bounces: shot.bounces,
            armed: false,
        });
        fired += 1;
    }
    fired
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WallContact {
    None,
    /// Horizontal motion blocked: the wall face is vertical.
    XAxis,
    /// Vertical motion blocked: the wall face is horizontal.
    YAxis,
}

/// Decides which velocity component a wall contact reflects.
///
/// Each axis is probed on its own so a flat wall only flips one component.
/// When both axes are blocked, or only the diagonal step is, the larger
/// component of the current heading is mirrored.
fn wall_contact(bullet: &Bullet, arena: &Arena) -> WallContact {
    let (vx, vy) = bullet.velocity();
    let (nx, ny) = (bullet.x + vx, bullet.y + vy);
    let blocked_x = is_colliding_with_wall(nx, bullet.y, BULLET_RADIUS, &arena.grid);
    let blocked_y = is_colliding_with_wall(bullet.x, ny, BULLET_RADIUS, &arena.grid);

    match (blocked_x, blocked_y) {
        (true, false) => WallContact::XAxis,
        (false, true) => WallContact::YAxis,
        (false, false) if !is_colliding_with_wall(nx, ny, BULLET_RADIUS, &arena.grid) => {
            WallContact::None
        }
        _ => {
            if bullet.angle.cos().abs() > bullet.angle.sin().abs() {
                WallContact::XAxis
            } else {
                WallContact::YAxis
            }
        }
    }
}

/// Reflects a heading off a wall face.
fn reflect(angle: f32, contact: WallContact) -> f32 {
    match contact {
        WallContact::XAxis => PI - angle,
        WallContact::YAxis => -angle,
        WallContact::None => angle,
    }
}

/// Advances every bullet one tick and resolves wall bounces, bullet clashes
/// and tank hits, in that order.
pub fn tick_bullets<R: Rng + ?Sized>(
    arena: &mut Arena,
    rules: CombatRules,
    drops: &DropTuning,
    rng: &mut R,
    events: &mut impl EventSink,
    report: &mut HitReport,
) {
    let mut removed: HashSet<u64> = HashSet::new();
    let mut bounced: HashSet<u64> = HashSet::new();

    // Movement and wall bounces.
    for index in 0..arena.bullets.len() {
        let contact = wall_contact(&arena.bullets[index], arena);
        let bullet = &mut arena.bullets[index];
        if contact == WallContact::None {
            let (vx, vy) = bullet.velocity();
            bullet.x += vx;
            bullet.y += vy;
            continue;
        }

        bounced.insert(bullet.id);
        if bullet.bounces == 0 {
            removed.insert(bullet.id);
            events.explosion(bullet.x, bullet.y, EXPLOSION_Z, WALL_EXPLOSION_SIZE);
        } else {
            bullet.bounces -= 1;
            bullet.angle = reflect(bullet.angle, contact);
            bullet.armed = true;
        }
    }

    // Bullet against bullet, among those that flew freely this tick.
    let free: Vec<usize> = (0..arena.bullets.len())
        .filter(|i| !bounced.contains(&arena.bullets[*i].id))
        .collect();
    let reach_sq = (2.0 * BULLET_RADIUS) * (2.0 * BULLET_RADIUS);
    for (n, &i) in free.iter().enumerate() {
        for &j in &free[n + 1..] {
            let (a, b) = (&arena.bullets[i], &arena.bullets[j]);
            if removed.contains(&a.id) || removed.contains(&b.id) {
                continue;
            }
            let (dx, dy) = (a.x - b.x, a.y - b.y);
            if dx * dx + dy * dy < reach_sq {
                removed.insert(a.id);
                removed.insert(b.id);
                events.explosion(
                    (a.x + b.x) / 2.0,
                    (a.y + b.y) / 2.0,
                    EXPLOSION_Z,
                    CLASH_EXPLOSION_SIZE,
                );
            }
        }
    }

    // Bullet against tank; the first tank in id order takes the hit.
    for index in 0..arena.bullets.len() {
        let bullet = &arena.bullets[index];
        if removed.contains(&bullet.id) || bounced.contains(&bullet.id) {
            continue;
        }
        let victim = arena
            .tanks
            .values()
            .filter(|tank| bullet.armed || tank.id != bullet.owner)
            .find(|tank| is_colliding_with_tank(bullet.x, bullet.y, tank, BULLET_RADIUS))
            .map(|tank| tank.id);
        let Some(victim) = victim else {
            if !bullet.armed {
                let clear = arena
                    .tanks
                    .get(&bullet.owner)
                    .is_none_or(|owner| !is_colliding_with_tank(bullet.x, bullet.y, owner, BULLET_RADIUS));
                arena.bullets[index].armed = clear;
            }
            continue;
        };

        let (id, owner) = (bullet.id, bullet.owner);
        removed.insert(id);
        apply_hit(arena, owner, victim, rules, drops, rng, events, report);
    }

    // Anything that slipped past the grid edge is gone.
    let (width, height) = arena.grid.world_size();
    arena.bullets.retain(|b| {
        !removed.contains(&b.id) && b.x >= 0.0 && b.y >= 0.0 && b.x < width && b.y < height
    });
}
