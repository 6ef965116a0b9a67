//! Collision detection and response
//!
//! Balls are circles, everything else is an axis-aligned rectangle. Normals
//! always point toward the first shape, so reflecting the first shape's
//! velocity about them sends it away from the second.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec2,
    /// Surface normal, pointing toward the first shape
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a ball and a rectangle
pub fn ball_rect_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    rect_center: Vec2,
    rect_half: Vec2,
) -> CollisionResult {
    let min = rect_center - rect_half;
    let max = rect_center + rect_half;
    let closest = ball_pos.clamp(min, max);
    let offset = ball_pos - closest;
    let dist = offset.length();

    if dist >= ball_radius {
        return CollisionResult::miss();
    }

    if dist > 1e-4 {
        return CollisionResult {
            hit: true,
            point: closest,
            normal: offset / dist,
            penetration: ball_radius - dist,
        };
    }

    // Center inside the rectangle (tunneling) - push out through the nearest face
    let inside = rect_overlap(ball_pos, Vec2::ZERO, rect_center, rect_half);
    CollisionResult {
        hit: true,
        point: ball_pos,
        normal: inside.normal,
        penetration: inside.penetration + ball_radius,
    }
}

/// Check collision between two balls
pub fn ball_ball_collision(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> CollisionResult {
    let offset = a - b;
    let dist = offset.length();
    let reach = a_radius + b_radius;
    if dist >= reach {
        return CollisionResult::miss();
    }
    let normal = if dist > 1e-4 { offset / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        point: b + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Check overlap of two rectangles, separating along the shallower axis
pub fn rect_overlap(a_center: Vec2, a_half: Vec2, b_center: Vec2, b_half: Vec2) -> CollisionResult {
    let delta = a_center - b_center;
    let overlap = (a_half + b_half) - delta.abs();
    if overlap.x < 0.0 || overlap.y < 0.0 {
        return CollisionResult::miss();
    }

    let (normal, penetration) = if overlap.x < overlap.y {
        (Vec2::new(if delta.x < 0.0 { -1.0 } else { 1.0 }, 0.0), overlap.x)
    } else {
        (Vec2::new(0.0, if delta.y < 0.0 { -1.0 } else { 1.0 }), overlap.y)
    };
    CollisionResult {
        hit: true,
        point: b_center + delta.clamp(-b_half, b_half),
        normal,
        penetration,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// True once a point has dropped past the bottom of the window
#[inline]
pub fn below_screen(center: Vec2, window_height: f32) -> bool {
    center.y > window_height
}
