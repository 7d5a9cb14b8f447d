// Incoming-bullet assessment for bots.

use crate::domain::state::{Bullet, Tank};
use crate::domain::tuning::TILE_SIZE;
use crate::domain::tuning::projectile::BULLET_RADIUS;
use crate::domain::tuning::tank::TANK_RADIUS;

/// Wide band: worth steering away from.
pub const DODGE_RANGE: f32 = 2.0 * TILE_SIZE;
pub const DODGE_COS: f32 = 0.707;
pub const DODGE_MISS: f32 = 2.0 * (TANK_RADIUS + BULLET_RADIUS);

/// Narrow band: on a near-direct collision course, worth shooting down.
pub const INTERCEPT_RANGE: f32 = 4.0 * TILE_SIZE;
pub const INTERCEPT_COS: f32 = 0.97;
pub const INTERCEPT_MISS: f32 = TANK_RADIUS + BULLET_RADIUS;

/// Time and squared distance of closest approach between a point moving
/// from `p` with velocity `v` and the origin.
///
/// `None` when the point is not moving or the approach lies in the past.
pub fn closest_approach(px: f32, py: f32, vx: f32, vy: f32) -> Option<(f32, f32)> {
    let vv = vx * vx + vy * vy;
    if vv <= f32::EPSILON {
        return None;
    }
    let t = -(px * vx + py * vy) / vv;
    if t < 0.0 {
        return None;
    }
    let (mx, my) = (px + vx * t, py + vy * t);
    Some((t, mx * mx + my * my))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub distance: f32,
    pub time_to_impact: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreatScan {
    /// Nearest bullet in the dodge band.
    pub dodge: Option<Threat>,
    /// Soonest bullet in the intercept band.
    pub intercept: Option<Threat>,
}

/// Classifies every bullet not fired by `tank` into the dodge and intercept bands.
pub fn scan(tank: &Tank, bullets: &[Bullet]) -> ThreatScan {
    let mut result = ThreatScan::default();

    for bullet in bullets.iter().filter(|b| b.owner != tank.id) {
        // Bullet relative to the tank.
        let (px, py) = (bullet.x - tank.x, bullet.y - tank.y);
        let distance = px.hypot(py);
        if distance <= f32::EPSILON || distance >= INTERCEPT_RANGE.max(DODGE_RANGE) {
            continue;
        }
        let (vx, vy) = bullet.velocity();
        let Some((t, miss_sq)) = closest_approach(px, py, vx, vy) else {
            continue;
        };

        // Heading of the bullet against the bullet-to-tank bearing.
        let cos = (bullet.angle.cos() * -px + bullet.angle.sin() * -py) / distance;
        let threat = Threat {
            x: bullet.x,
            y: bullet.y,
            vx,
            vy,
            angle: bullet.angle,
            distance,
            time_to_impact: t,
        };

        if distance < DODGE_RANGE && cos > DODGE_COS && miss_sq < DODGE_MISS * DODGE_MISS {
            let nearer = result.dodge.is_none_or(|d| distance < d.distance);
            if nearer {
                result.dodge = Some(threat);
            }
        }
        if distance < INTERCEPT_RANGE
            && cos > INTERCEPT_COS
            && miss_sq < INTERCEPT_MISS * INTERCEPT_MISS
        {
            let sooner = result.intercept.is_none_or(|i| t < i.time_to_impact);
            if sooner {
                result.intercept = Some(threat);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::{EntityId, TankKind};
    use std::f32::consts::PI;

    fn bot_at(x: f32, y: f32) -> Tank {
        Tank::new(EntityId::Bot(1), TankKind::Tier(2), x, y)
    }

    fn incoming(x: f32, y: f32, angle: f32) -> Bullet {
        Bullet {
            id: 1,
            owner: EntityId::Human(1),
            x,
            y,
            angle,
            speed: 4.0,
            bounces: 1,
            armed: true,
        }
    }

    #[test]
    fn when_minimizing_then_closest_approach_matches_analytic_optimum() {
        let (px, py, vx, vy) = (-50.0_f32, 12.0_f32, 3.0_f32, 0.5_f32);
        let (t, miss_sq) = closest_approach(px, py, vx, vy).unwrap();
        let dist_sq = |t: f32| (px + vx * t).powi(2) + (py + vy * t).powi(2);
        assert!((t - (-(px * vx + py * vy) / (vx * vx + vy * vy))).abs() < 1e-5);
        assert!((dist_sq(t) - miss_sq).abs() < 1e-2);
        assert!(dist_sq(t - 0.5) >= miss_sq && dist_sq(t + 0.5) >= miss_sq);
    }

    #[test]
    fn when_approach_is_in_the_past_then_it_is_never_a_threat() {
        assert_eq!(closest_approach(50.0, 0.0, 4.0, 0.0), None);

        // Right next to the tank but flying away from it.
        let tank = bot_at(200.0, 200.0);
        let scan = scan(&tank, &[incoming(230.0, 200.0, 0.0)]);
        assert_eq!(scan, ThreatScan::default());
    }

    #[test]
    fn when_bullet_flies_straight_at_tank_then_both_bands_trigger() {
        let tank = bot_at(200.0, 200.0);
        let scan = scan(&tank, &[incoming(120.0, 200.0, 0.0)]);
        assert!(scan.dodge.is_some());
        let intercept = scan.intercept.unwrap();
        assert!((intercept.time_to_impact - 20.0).abs() < 1e-3);
    }

    #[test]
    fn when_bullet_is_far_but_on_course_then_only_intercept_band_triggers() {
        let tank = bot_at(400.0, 200.0);
        let scan = scan(&tank, &[incoming(250.0, 200.0, 0.0)]);
        assert!(scan.dodge.is_none());
        assert!(scan.intercept.is_some());
    }

    #[test]
    fn when_bullet_passes_wide_then_only_dodge_band_triggers() {
        let tank = bot_at(200.0, 200.0);
        // Heading roughly at the tank but set to miss by about 30 units.
        let scan = scan(&tank, &[incoming(130.0, 235.0, -PI / 36.0)]);
        assert!(scan.dodge.is_some());
        assert!(scan.intercept.is_none());
    }

    #[test]
    fn when_bullet_is_own_then_it_is_ignored() {
        let tank = bot_at(200.0, 200.0);
        let mut own = incoming(150.0, 200.0, 0.0);
        own.owner = tank.id;
        assert_eq!(scan(&tank, &[own]), ThreatScan::default());
    }
}
