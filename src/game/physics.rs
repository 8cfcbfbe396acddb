//! Movement, world bounds, separation and attack-arc geometry

use std::f32::consts::{PI, TAU};

use super::input::Movement;

/// Physics helpers shared by the resolver and the fallback simulation
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Velocity for one tick from the held direction keys.
    ///
    /// The raw vector is capped at `speed` so diagonals never outrun cardinal
    /// movement; while dashing the capped vector is scaled by `dash_multiplier`.
    pub fn movement_velocity(
        movement: Movement,
        speed: f32,
        dashing: bool,
        dash_multiplier: f32,
    ) -> (f32, f32) {
        let mut vx = 0.0;
        let mut vy = 0.0;

        if movement.move_left {
            vx -= speed;
        }
        if movement.move_right {
            vx += speed;
        }
        if movement.move_up {
            vy -= speed;
        }
        if movement.move_down {
            vy += speed;
        }

        let magnitude = (vx * vx + vy * vy).sqrt();
        if magnitude > speed {
            let scale = speed / magnitude;
            vx *= scale;
            vy *= scale;
        }

        if dashing {
            vx *= dash_multiplier;
            vy *= dash_multiplier;
        }

        (vx, vy)
    }

    /// Clamp a centre point so a circle of `radius` stays inside the world
    pub fn clamp_to_world(x: f32, y: f32, radius: f32, width: f32, height: f32) -> (f32, f32) {
        // max/min rather than f32::clamp: never panics if radius outgrows the world
        let x = x.min(width - radius).max(radius);
        let y = y.min(height - radius).max(radius);
        (x, y)
    }

    /// Whether two circles overlap
    pub fn check_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined = r1 + r2;
        dx * dx + dy * dy < combined * combined
    }

    /// Push two overlapping circles apart along the line between their centres.
    /// Returns ((new_x1, new_y1), (new_x2, new_y2))
    pub fn resolve_overlap(
        x1: f32,
        y1: f32,
        r1: f32,
        x2: f32,
        y2: f32,
        r2: f32,
        buffer: f32,
    ) -> ((f32, f32), (f32, f32)) {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let dist = (dx * dx + dy * dy).sqrt();

        let combined = r1 + r2;
        let overlap = combined - dist;

        if overlap <= 0.0 {
            return ((x1, y1), (x2, y2));
        }

        if dist < 0.001 {
            // Coincident centres have no separating axis, split along x
            let push = combined / 2.0 + buffer;
            return ((x1 - push, y1), (x2 + push, y2));
        }

        let nx = dx / dist;
        let ny = dy / dist;
        let push = overlap / 2.0 + buffer;

        ((x1 - nx * push, y1 - ny * push), (x2 + nx * push, y2 + ny * push))
    }

    /// Wrap an angle into `(-PI, PI]`. Angles already in range are returned as is.
    pub fn wrap_angle(angle: f32) -> f32 {
        if angle > -PI && angle <= PI {
            return angle;
        }
        let wrapped = (angle + PI).rem_euclid(TAU) - PI;
        if wrapped <= -PI {
            wrapped + TAU
        } else {
            wrapped
        }
    }

    /// Unsigned angular distance between two headings, in `[0, PI]`
    pub fn angular_distance(a: f32, b: f32) -> f32 {
        let diff = (a - b).abs().rem_euclid(TAU);
        if diff > PI {
            TAU - diff
        } else {
            diff
        }
    }

    /// Whether `target_angle` lies inside the symmetric arc of `half_arc`
    /// radians around `facing`. The boundary itself counts as inside.
    pub fn within_arc(facing: f32, target_angle: f32, half_arc: f32) -> bool {
        Self::angular_distance(facing, target_angle) <= half_arc
    }
}
