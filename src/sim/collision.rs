//! Collision detection and response
//!
//! Ball against the playfield walls, the paddle and the axis-aligned brick
//! rectangles. Every response mutates the ball in place and reports whether
//! something was hit so the caller can play the right sound.

use glam::Vec2;

use super::state::{Ball, Paddle, Rect};

/// Edge of a rectangle the ball was pushed out through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Result of a ball/rectangle check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether the circle overlaps the rectangle
    pub hit: bool,
    /// Edge of minimum penetration (None on a miss, or when already past it)
    pub side: Option<Side>,
    /// Overlap along `side`
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            side: None,
            penetration: 0.0,
        }
    }
}

/// Check a ball against a rectangle.
///
/// A hit whose minimum edge penetration is not positive has no side: the ball
/// is already past that edge and must not be resolved again this frame.
pub fn ball_rect_collision(pos: Vec2, radius: f32, rect: &Rect) -> CollisionResult {
    let closest = rect.closest_point(pos);
    if pos.distance_squared(closest) >= radius * radius {
        return CollisionResult::miss();
    }

    let overlaps = [
        (Side::Left, (pos.x + radius) - rect.x),
        (Side::Right, rect.right() - (pos.x - radius)),
        (Side::Top, (pos.y + radius) - rect.y),
        (Side::Bottom, rect.bottom() - (pos.y - radius)),
    ];
    // First minimum wins, in Left/Right/Top/Bottom order
    let (side, penetration) = overlaps
        .iter()
        .copied()
        .fold(overlaps[0], |best, o| if o.1 < best.1 { o } else { best });

    CollisionResult {
        hit: true,
        side: (penetration > 0.0).then_some(side),
        penetration,
    }
}

/// Push the ball flush against `side` and point its velocity away from it
pub fn resolve_rect(ball: &mut Ball, rect: &Rect, side: Side) {
    match side {
        Side::Left => {
            ball.pos.x = rect.x - ball.radius;
            ball.vel.x = -ball.vel.x.abs();
        }
        Side::Right => {
            ball.pos.x = rect.right() + ball.radius;
            ball.vel.x = ball.vel.x.abs();
        }
        Side::Top => {
            ball.pos.y = rect.y - ball.radius;
            ball.vel.y = -ball.vel.y.abs();
        }
        Side::Bottom => {
            ball.pos.y = rect.bottom() + ball.radius;
            ball.vel.y = ball.vel.y.abs();
        }
    }
}

/// Reflect off the side walls, clamping inside. Returns true on contact.
pub fn collide_side_walls(ball: &mut Ball, width: f32) -> bool {
    if ball.pos.x + ball.radius > width {
        ball.pos.x = width - ball.radius;
        ball.vel.x = -ball.vel.x.abs();
        true
    } else if ball.pos.x - ball.radius < 0.0 {
        ball.pos.x = ball.radius;
        ball.vel.x = ball.vel.x.abs();
        true
    } else {
        false
    }
}

/// Reflect off the ceiling line below the HUD. Returns true on contact.
pub fn collide_ceiling(ball: &mut Ball, ceiling_y: f32) -> bool {
    if ball.pos.y - ball.radius < ceiling_y {
        ball.pos.y = ceiling_y + ball.radius;
        ball.vel.y = ball.vel.y.abs();
        true
    } else {
        false
    }
}

/// Where on the paddle the ball landed, -1 (left edge) to 1 (right edge)
#[inline]
pub fn paddle_hit_offset(ball_x: f32, paddle: &Paddle) -> f32 {
    ((ball_x - paddle.center()) / (paddle.width / 2.0)).clamp(-1.0, 1.0)
}

/// Bounce off the paddle with steering.
///
/// Contact needs the ball's vertical span to overlap the paddle band and its
/// centre strictly inside the paddle's horizontal span. The rebound always
/// goes up; dx is the hit offset scaled to `speed * steer`.
pub fn collide_paddle(
    ball: &mut Ball,
    paddle: &Paddle,
    paddle_y: f32,
    paddle_height: f32,
    speed: f32,
    steer: f32,
) -> bool {
    let overlaps_band =
        ball.pos.y + ball.radius > paddle_y && ball.pos.y - ball.radius < paddle_y + paddle_height;
    let within_span = ball.pos.x > paddle.x && ball.pos.x < paddle.x + paddle.width;
    if !(overlaps_band && within_span) {
        return false;
    }

    ball.pos.y = paddle_y - ball.radius;
    ball.vel.x = paddle_hit_offset(ball.pos.x, paddle) * speed * steer;
    ball.vel.y = -ball.vel.y.abs();
    true
}
