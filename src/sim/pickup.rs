//! Falling pickups
//!
//! Dropped by time-scale bricks. A pickup falls straight down, ignores everything
//! but paddles, and sets the game's time scale when a paddle catches it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::registry::{ColliderKind, EntityId, Layer};
use super::state::{Body, GameContext, GameEvent};
use crate::consts::*;
use crate::platform::ImageHandle;

/// A falling time-scale pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub body: Body,
    pub image: ImageHandle,
    /// Time scale applied on catch
    pub time_scale: f32,
}

impl Pickup {
    pub fn new(center: Vec2, image: ImageHandle, time_scale: f32) -> Self {
        let mut body = Body::new(center, Vec2::new(PICKUP_WIDTH, PICKUP_HEIGHT));
        body.vel = Vec2::new(0.0, PICKUP_FALL_SPEED);
        Self {
            body,
            image,
            time_scale,
        }
    }

    /// Collision filter: paddles only
    pub fn should_collide_with(other: ColliderKind) -> bool {
        other == ColliderKind::Paddle
    }
}

/// Paddle caught pickup `id`: remove it and apply its time scale.
///
/// Returns false if the pickup was already gone.
pub fn collect(id: EntityId, ctx: &mut GameContext) -> bool {
    let Some(time_scale) = ctx
        .registry
        .get(id)
        .and_then(|e| e.as_pickup())
        .map(|p| p.time_scale)
    else {
        return false;
    };
    if !ctx.remove_entity(id, Layer::Default) {
        return false;
    }
    ctx.window.set_time_scale(time_scale);
    ctx.emit(GameEvent::TimeScaleChanged { time_scale });
    log::debug!("Pickup {id:?} caught, time scale now {time_scale}");
    true
}
