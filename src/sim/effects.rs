//! Brick collision effects
//!
//! Every brick owns one effect chain. A chain is a stack of decorators ending in
//! `RemoveBrick`; invoking the chain runs each decorator's delegate first (so the
//! brick is gone before anything spawns) and then its own behavior.
//!
//! Effects are stored in an `EffectArena` and refer to their wrapped effect by
//! `EffectId`. Chains may share nodes: every chain built by the factory ends in
//! the same `RemoveBrick` node. All mutable game state an effect touches comes
//! in through `GameContext`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::countdown::CountdownAgent;
use super::pickup::Pickup;
use super::registry::{Entity, EntityId, Layer};
use super::state::{Ball, BallKind, Body, Camera, GameContext, GameEvent, Paddle};
use crate::consts::*;
use crate::platform::{ImageHandle, SoundHandle};
use crate::same_scale;

/// Index of an effect in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u32);

/// Effect variant without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    RemoveBrick,
    MultiBallSplit,
    ExtraPaddle,
    CameraFocus,
    TimeScaleDrop,
}

/// A node in an effect chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Terminal: take the brick out of `layer` and count it
    RemoveBrick { layer: Layer },
    /// Spawn pucks where the brick was
    MultiBallSplit {
        inner: EffectId,
        puck_image: ImageHandle,
        puck_sound: SoundHandle,
    },
    /// Spawn the extra paddle if there is none
    ExtraPaddle {
        inner: EffectId,
        paddle_image: ImageHandle,
    },
    /// Follow the ball with the camera for a few impacts
    CameraFocus {
        inner: EffectId,
        agent: Option<EntityId>,
    },
    /// Drop a time-scale pickup
    TimeScaleDrop {
        inner: EffectId,
        slow_image: ImageHandle,
        fast_image: ImageHandle,
    },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::RemoveBrick { .. } => EffectKind::RemoveBrick,
            Effect::MultiBallSplit { .. } => EffectKind::MultiBallSplit,
            Effect::ExtraPaddle { .. } => EffectKind::ExtraPaddle,
            Effect::CameraFocus { .. } => EffectKind::CameraFocus,
            Effect::TimeScaleDrop { .. } => EffectKind::TimeScaleDrop,
        }
    }

    /// Wrapped effect; `None` for the terminal
    pub fn inner(&self) -> Option<EffectId> {
        match *self {
            Effect::RemoveBrick { .. } => None,
            Effect::MultiBallSplit { inner, .. }
            | Effect::ExtraPaddle { inner, .. }
            | Effect::CameraFocus { inner, .. }
            | Effect::TimeScaleDrop { inner, .. } => Some(inner),
        }
    }
}

/// A brick struck by something, captured before any effect runs
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub brick: EntityId,
    /// Brick geometry at impact (the brick may be gone by the time decorators run)
    pub brick_body: Body,
    /// The striking entity
    pub other: EntityId,
    pub other_is_puck: bool,
}

/// Storage for every effect node in the level
#[derive(Debug, Clone, Default)]
pub struct EffectArena {
    nodes: Vec<Effect>,
}

impl EffectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect. Decorators must wrap an effect already in the arena.
    pub fn push(&mut self, effect: Effect) -> EffectId {
        debug_assert!(
            effect.inner().is_none_or(|inner| (inner.0 as usize) < self.nodes.len()),
            "decorator wraps unknown effect"
        );
        let id = EffectId(self.nodes.len() as u32);
        self.nodes.push(effect);
        id
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Effect kinds from the outermost decorator down to the terminal
    pub fn chain(&self, id: EffectId) -> Vec<EffectKind> {
        let mut kinds = Vec::new();
        let mut cursor = Some(id);
        while let Some(effect) = cursor.and_then(|id| self.get(id)) {
            kinds.push(effect.kind());
            cursor = effect.inner();
        }
        kinds
    }

    /// The `RemoveBrick` node a chain ends in
    pub fn terminal(&self, id: EffectId) -> Option<EffectId> {
        let mut current = id;
        loop {
            match self.get(current)? {
                Effect::RemoveBrick { .. } => return Some(current),
                effect => current = effect.inner()?,
            }
        }
    }

    /// Registry layer the chain removes bricks from. Decorators forward to
    /// their wrapped effect.
    pub fn brick_layer(&self, id: EffectId) -> Option<Layer> {
        match self.get(id)? {
            Effect::RemoveBrick { layer } => Some(*layer),
            effect => self.brick_layer(effect.inner()?),
        }
    }

    /// True if the chain ends in exactly one `RemoveBrick`
    pub fn is_well_formed(&self, id: EffectId) -> bool {
        let kinds = self.chain(id);
        kinds.last() == Some(&EffectKind::RemoveBrick)
            && kinds.iter().filter(|&&k| k == EffectKind::RemoveBrick).count() == 1
    }

    /// Run the chain `id` for one brick impact
    pub fn on_collision(&mut self, id: EffectId, hit: &Hit, ctx: &mut GameContext) {
        let Some(effect) = self.get(id).copied() else {
            log::warn!("Brick {:?} points at missing effect {id:?}", hit.brick);
            return;
        };

        match effect {
            Effect::RemoveBrick { layer } => remove_brick(hit, layer, ctx),
            Effect::MultiBallSplit {
                inner,
                puck_image,
                puck_sound,
            } => {
                self.on_collision(inner, hit, ctx);
                split_into_pucks(hit, puck_image, puck_sound, ctx);
            }
            Effect::ExtraPaddle {
                inner,
                paddle_image,
            } => {
                self.on_collision(inner, hit, ctx);
                add_extra_paddle(hit, paddle_image, ctx);
            }
            Effect::CameraFocus { inner, .. } => {
                self.on_collision(inner, hit, ctx);
                if let Some(agent) = focus_camera(id, hit, ctx) {
                    if let Some(Effect::CameraFocus { agent: slot, .. }) =
                        self.nodes.get_mut(id.0 as usize)
                    {
                        *slot = Some(agent);
                    }
                }
            }
            Effect::TimeScaleDrop {
                inner,
                slow_image,
                fast_image,
            } => {
                self.on_collision(inner, hit, ctx);
                drop_time_pickup(hit, slow_image, fast_image, ctx);
            }
        }
    }

    /// Countdown callback for a camera focus: restore the default camera and
    /// take the agent out of the registry
    pub fn release_camera(&mut self, owner: EffectId, ctx: &mut GameContext) {
        let Some(Effect::CameraFocus { agent, .. }) = self.nodes.get_mut(owner.0 as usize) else {
            log::warn!("Countdown owner {owner:?} is not a camera focus");
            return;
        };
        ctx.window.set_camera(None);
        ctx.emit(GameEvent::CameraReleased);
        if let Some(agent_id) = agent.take() {
            if let Some(Entity::Countdown(countdown)) = ctx.registry.get_mut(agent_id) {
                countdown.detach();
            }
            ctx.registry.remove(agent_id, Layer::Default);
        }
        log::debug!("Camera focus released");
    }
}

fn remove_brick(hit: &Hit, layer: Layer, ctx: &mut GameContext) {
    // Removal succeeds once per brick; only that call counts
    if ctx.registry.remove(hit.brick, layer) {
        ctx.bricks_left = ctx.bricks_left.saturating_sub(1);
        ctx.emit(GameEvent::BrickDestroyed { brick: hit.brick });
    }
}

fn split_into_pucks(
    hit: &Hit,
    image: ImageHandle,
    sound: SoundHandle,
    ctx: &mut GameContext,
) {
    let size = Vec2::splat(hit.brick_body.size.x / 3.0);
    for _ in 0..NUM_OF_PUCKS {
        let mut body = Body::new(hit.brick_body.center, size);
        body.vel = crate::random_diagonal(&mut ctx.rng, ctx.ball_speed);
        let puck = Ball::new(BallKind::Puck, body, image, sound);
        ctx.registry.add(Entity::Ball(puck), Layer::Default);
    }
    ctx.emit(GameEvent::PucksSpawned {
        count: NUM_OF_PUCKS,
    });
    log::debug!("Split brick {:?} into {NUM_OF_PUCKS} puck(s)", hit.brick);
}

fn add_extra_paddle(hit: &Hit, image: ImageHandle, ctx: &mut GameContext) {
    if ctx.extra_paddle_active() {
        return;
    }
    let center = Vec2::new(hit.brick_body.center.x, ctx.window.dimensions().y / 2.0);
    let paddle = Paddle::extra(center, image, ctx.extra_paddle_hits);
    if let Some(id) = ctx.spawn_extra_paddle(paddle) {
        log::debug!("Extra paddle {id:?} spawned at x={}", center.x);
    }
}

/// Install the follow camera and its countdown. Returns the agent on success.
fn focus_camera(owner: EffectId, hit: &Hit, ctx: &mut GameContext) -> Option<EntityId> {
    if ctx.window.camera().is_some() || hit.other_is_puck {
        return None;
    }
    let ball = ctx.registry.get(hit.other).and_then(Entity::as_ball)?;
    let hits = ball.collision_counter();
    let center = ball.body.center;

    let dims = ctx.window.dimensions();
    ctx.window.set_camera(Some(Camera {
        follow: hit.other,
        frame: dims * CAMERA_FRAME_SCALE,
        window: dims,
        center,
    }));
    let agent = CountdownAgent::new(hit.other, hits, owner, ctx.camera_focus_hits);
    let agent_id = ctx.registry.add(Entity::Countdown(agent), Layer::Default);
    ctx.emit(GameEvent::CameraFocused { target: hit.other });
    log::debug!("Camera focused on {:?} until {} more hits", hit.other, ctx.camera_focus_hits);
    Some(agent_id)
}

/// Scale carried by the next dropped pickup: random at the default pace,
/// otherwise the opposite of the current one
pub fn choose_pickup_scale<R: rand::Rng + ?Sized>(current: f32, rng: &mut R) -> f32 {
    if same_scale(current, DEFAULT_TIME_SCALE) {
        if rng.random_bool(0.5) {
            SLOW_TIME_SCALE
        } else {
            FAST_TIME_SCALE
        }
    } else if same_scale(current, FAST_TIME_SCALE) {
        SLOW_TIME_SCALE
    } else {
        FAST_TIME_SCALE
    }
}

fn drop_time_pickup(
    hit: &Hit,
    slow_image: ImageHandle,
    fast_image: ImageHandle,
    ctx: &mut GameContext,
) {
    let time_scale = choose_pickup_scale(ctx.window.time_scale(), &mut ctx.rng);
    let image = if same_scale(time_scale, SLOW_TIME_SCALE) {
        slow_image
    } else {
        fast_image
    };
    let pickup = Pickup::new(hit.brick_body.center, image, time_scale);
    ctx.registry.add(Entity::Pickup(pickup), Layer::Default);
    ctx.emit(GameEvent::PickupDropped { time_scale });
}
