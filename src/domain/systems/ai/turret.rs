// Turret aim, target acquisition and fire patterns for bots.

use super::threat::Threat;
use crate::domain::geometry::{angle_between, lerp_angle, normalize_angle, ray_hits_wall};
use crate::domain::grid::TileGrid;
use crate::domain::state::{EntityId, Tank};
use crate::domain::systems::projectiles::{Muzzle, Shot, fire};
use crate::domain::tuning::TILE_SIZE;
use crate::domain::tuning::tier::{FirePattern, TierProfile};
use crate::domain::world::Arena;
use rand::Rng;
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_3;

/// Half-width of the cone a turret can "see" into.
pub const SIGHT_CONE: f32 = FRAC_PI_3;

/// Aim error under which the trigger is pulled.
pub const FIRE_TOLERANCE: f32 = 0.25;

/// Ticks between re-randomized idle sweeps.
const IDLE_SWEEP_TICKS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub id: EntityId,
    pub bearing: f32,
    pub distance: f32,
}

/// Nearest living human within range, inside the turret cone, with a clear
/// line of fire.
pub fn find_target(tank: &Tank, range: f32, tanks: &BTreeMap<EntityId, Tank>, grid: &TileGrid) -> Option<Target> {
    tanks
        .values()
        .filter(|t| t.is_alive_human())
        .filter_map(|t| {
            let (dx, dy) = (t.x - tank.x, t.y - tank.y);
            let distance = dx.hypot(dy);
            if distance > range {
                return None;
            }
            let bearing = dy.atan2(dx);
            if angle_between(tank.turret_angle, bearing) > SIGHT_CONE {
                return None;
            }
            if ray_hits_wall(tank.x, tank.y, bearing, distance, TILE_SIZE / 2.0, grid) {
                return None;
            }
            Some(Target {
                id: t.id,
                bearing,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Direction to fire so that a shot of `shot_speed` meets a point starting
/// at `(dx, dy)` relative to the shooter and moving with `(vx, vy)`.
///
/// Solves `(V·V - s²)t² + 2(D·V)t + D·D = 0` for the smallest positive `t`.
pub fn intercept_angle(dx: f32, dy: f32, vx: f32, vy: f32, shot_speed: f32) -> Option<f32> {
    let a = vx * vx + vy * vy - shot_speed * shot_speed;
    let b = 2.0 * (dx * vx + dy * vy);
    let c = dx * dx + dy * dy;

    let t = if a.abs() < 1e-6 {
        if b.abs() < 1e-6 {
            return None;
        }
        -c / b
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let (t1, t2) = ((-b - root) / (2.0 * a), (-b + root) / (2.0 * a));
        match (t1 > 0.0, t2 > 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };
    if t <= 0.0 {
        return None;
    }
    Some((dy + vy * t).atan2(dx + vx * t))
}

/// Snaps the turret onto an incoming bullet and fires once at half the
/// tier's cooldown. Returns whether a bullet left the barrel.
pub fn point_defense(tank: &mut Tank, profile: &TierProfile, threat: &Threat, arena: &mut Arena) -> bool {
    if tank.fire_cooldown > 0 {
        return false;
    }
    let Some(aim) = intercept_angle(
        threat.x - tank.x,
        threat.y - tank.y,
        threat.vx,
        threat.vy,
        profile.bullet_speed,
    ) else {
        return false;
    };
    tank.turret_angle = aim;
    let fired = fire(arena, Muzzle::of_bot(tank), single_shot(profile, aim));
    if fired > 0 {
        tank.fire_cooldown = profile.fire_cooldown / 2;
    }
    fired > 0
}

/// Eases the turret toward `bearing`.
pub fn track(tank: &mut Tank, profile: &TierProfile, bearing: f32) {
    tank.turret_angle = normalize_angle(lerp_angle(tank.turret_angle, bearing, profile.turret_rate * 2.0));
}

/// Slow random sweep while nobody is in sight.
pub fn idle_sweep<R: Rng + ?Sized>(tank: &mut Tank, profile: &TierProfile, rng: &mut R) {
    if tank.idle_turret_timer == 0 {
        tank.idle_turret_velocity = (rng.r#gen::<f32>() - 0.5) * 2.0 * profile.turret_rate;
        tank.idle_turret_timer = IDLE_SWEEP_TICKS;
    }
    tank.idle_turret_timer -= 1;
    tank.turret_angle = normalize_angle(tank.turret_angle + tank.idle_turret_velocity);
}

fn single_shot(profile: &TierProfile, angle: f32) -> Shot {
    Shot {
        angle,
        speed: profile.bullet_speed,
        bounces: profile.bullet_bounces,
        count: 1,
        max_bullets: Some(profile.max_bullets),
    }
}

/// Pulls the trigger according to the tier's bullet pattern when the turret
/// is on target and the cooldown has elapsed. Beams are handled elsewhere.
pub fn pull_trigger(tank: &mut Tank, profile: &TierProfile, target: &Target, arena: &mut Arena) {
    if tank.fire_cooldown > 0 || angle_between(tank.turret_angle, target.bearing) > FIRE_TOLERANCE {
        return;
    }
    let shot = match profile.pattern {
        FirePattern::Single => single_shot(profile, tank.turret_angle),
        FirePattern::Burst { shots, delay } => {
            tank.burst_remaining = shots.saturating_sub(1);
            tank.burst_timer = delay;
            single_shot(profile, tank.turret_angle)
        }
        FirePattern::Spread { count } => Shot {
            count,
            ..single_shot(profile, tank.turret_angle)
        },
        FirePattern::Beam => return,
    };
    fire(arena, Muzzle::of_bot(tank), shot);
    tank.fire_cooldown = profile.fire_cooldown;
}

/// Fires the remaining shots of a burst, `delay` ticks apart.
pub fn continue_burst(tank: &mut Tank, profile: &TierProfile, arena: &mut Arena) {
    let FirePattern::Burst { delay, .. } = profile.pattern else {
        return;
    };
    if tank.burst_remaining == 0 {
        return;
    }
    tank.burst_timer = tank.burst_timer.saturating_sub(1);
    if tank.burst_timer == 0 {
        fire(arena, Muzzle::of_bot(tank), single_shot(profile, tank.turret_angle));
        tank.burst_remaining -= 1;
        tank.burst_timer = delay;
    }
}
