//! Game state and core simulation types
//!
//! Everything an effect may touch lives in `GameContext`, which is handed to every
//! effect invocation. `GameState` adds the effect arena and frame bookkeeping.

use std::collections::HashSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::effects::{EffectArena, EffectId};
use super::registry::{Entity, EntityId, Layer, ObjectRegistry};
use crate::consts::*;
use crate::platform::{AssetProvider, ImageHandle, SoundHandle};
use crate::settings::Settings;

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// All bricks destroyed
    Won,
    /// All lives lost
    Lost,
}

/// Notifications for the host (audio, HUD), drained once per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PlaySound(SoundHandle),
    BrickDestroyed { brick: EntityId },
    PucksSpawned { count: usize },
    ExtraPaddleSpawned { paddle: EntityId },
    ExtraPaddleRemoved { paddle: EntityId },
    CameraFocused { target: EntityId },
    CameraReleased,
    PickupDropped { time_scale: f32 },
    TimeScaleChanged { time_scale: f32 },
    LifeLost { lives_left: u32 },
    Won,
    Lost,
}

/// Axis-aligned physical extent plus velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub center: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
}

impl Body {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            size,
            vel: Vec2::ZERO,
        }
    }

    /// Build from a top-left corner instead of a center
    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        Self::new(top_left + size / 2.0, size)
    }

    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        self.size / 2.0
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.center.x - self.size.x / 2.0
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.center.x + self.size.x / 2.0
    }

    /// Advance position by velocity
    pub fn integrate(&mut self, dt: f32) {
        self.center += self.vel * dt;
    }
}

/// Main ball or a split-off puck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallKind {
    Main,
    Puck,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub body: Body,
    pub kind: BallKind,
    pub image: ImageHandle,
    pub sound: SoundHandle,
    /// Non-ball collisions since creation (never decreases)
    hits: u32,
}

impl Ball {
    pub fn new(kind: BallKind, body: Body, image: ImageHandle, sound: SoundHandle) -> Self {
        Self {
            body,
            kind,
            image,
            sound,
            hits: 0,
        }
    }

    pub fn is_puck(&self) -> bool {
        self.kind == BallKind::Puck
    }

    pub fn radius(&self) -> f32 {
        self.body.size.x / 2.0
    }

    pub fn collision_counter(&self) -> u32 {
        self.hits
    }

    /// React to the start of a contact.
    ///
    /// `normal` points from the surface toward the ball. Contacts with other
    /// balls are ignored. Returns true if the contact counted.
    pub fn on_collision_enter(
        &mut self,
        other_is_ball: bool,
        normal: Vec2,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        if other_is_ball {
            return false;
        }
        // Only bounce if still heading into the surface; a second contact in the
        // same frame must not undo the first reflection.
        if self.body.vel.dot(normal) < 0.0 {
            self.body.vel = super::collision::reflect_velocity(self.body.vel, normal);
        }
        events.push(GameEvent::PlaySound(self.sound));
        self.hits += 1;
        true
    }
}

/// Player paddle or the temporary extra paddle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddleKind {
    Main,
    Extra { hits_left: u32 },
}

/// A paddle entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub body: Body,
    pub kind: PaddleKind,
    pub image: ImageHandle,
}

impl Paddle {
    pub fn main(center: Vec2, image: ImageHandle) -> Self {
        Self {
            body: Body::new(center, Vec2::new(PADDLE_WIDTH, PADDLE_HEIGHT)),
            kind: PaddleKind::Main,
            image,
        }
    }

    pub fn extra(center: Vec2, image: ImageHandle, hits: u32) -> Self {
        Self {
            body: Body::new(center, Vec2::new(PADDLE_WIDTH, PADDLE_HEIGHT)),
            kind: PaddleKind::Extra { hits_left: hits },
            image,
        }
    }

    pub fn is_extra(&self) -> bool {
        matches!(self.kind, PaddleKind::Extra { .. })
    }

    /// Move horizontally in `direction` (-1, 0, 1), staying clear of the walls
    pub fn steer(&mut self, direction: f32, dt: f32, window_width: f32) {
        self.body.vel = Vec2::new(direction * PADDLE_SPEED, 0.0);
        self.body.integrate(dt);
        let half = self.body.size.x / 2.0;
        let min_x = BUFFER_FROM_WALL + half;
        let max_x = window_width - BUFFER_FROM_WALL - half;
        self.body.center.x = self.body.center.x.clamp(min_x, max_x.max(min_x));
    }

    /// React to the start of a contact. Returns true once an extra paddle is worn out.
    pub fn on_collision_enter(&mut self) -> bool {
        match &mut self.kind {
            PaddleKind::Main => false,
            PaddleKind::Extra { hits_left } => {
                *hits_left = hits_left.saturating_sub(1);
                *hits_left == 0
            }
        }
    }
}

/// A brick entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brick {
    pub body: Body,
    pub image: ImageHandle,
    effect: EffectId,
    has_been_hit: bool,
}

impl Brick {
    pub fn new(body: Body, image: ImageHandle, effect: EffectId) -> Self {
        Self {
            body,
            image,
            effect,
            has_been_hit: false,
        }
    }

    /// Effect chain assigned at level build
    pub fn effect(&self) -> EffectId {
        self.effect
    }

    pub fn has_been_hit(&self) -> bool {
        self.has_been_hit
    }

    /// Latch the first contact. Returns the effect to run, or `None` for repeats.
    pub fn on_collision_enter(&mut self) -> Option<EffectId> {
        if self.has_been_hit {
            return None;
        }
        self.has_been_hit = true;
        Some(self.effect)
    }
}

/// Camera override following an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub follow: EntityId,
    /// World-space area shown
    pub frame: Vec2,
    /// Screen-space window size
    pub window: Vec2,
    /// Current center, tracks `follow`
    pub center: Vec2,
}

/// Window and time controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    dimensions: Vec2,
    time_scale: f32,
    camera: Option<Camera>,
}

impl Window {
    pub fn new(dimensions: Vec2) -> Self {
        Self {
            dimensions,
            time_scale: DEFAULT_TIME_SCALE,
            camera: None,
        }
    }

    pub fn dimensions(&self) -> Vec2 {
        self.dimensions
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }
}

/// Shared mutable state handed to every effect
#[derive(Debug, Clone)]
pub struct GameContext {
    pub registry: ObjectRegistry,
    pub window: Window,
    pub rng: Pcg32,
    /// Bricks still standing
    pub bricks_left: u32,
    pub lives: u32,
    pub events: Vec<GameEvent>,
    /// Collisions a new extra paddle survives
    pub extra_paddle_hits: u32,
    /// Ball impacts before a camera focus expires
    pub camera_focus_hits: u32,
    /// Per-axis speed of the main ball and every puck
    pub ball_speed: f32,
    extra_paddle_active: bool,
}

impl GameContext {
    pub fn new(dimensions: Vec2, seed: u64, lives: u32) -> Self {
        Self {
            registry: ObjectRegistry::new(),
            window: Window::new(dimensions),
            rng: Pcg32::seed_from_u64(seed),
            bricks_left: 0,
            lives,
            events: Vec::new(),
            extra_paddle_hits: 4,
            camera_focus_hits: 4,
            ball_speed: BALL_SPEED,
            extra_paddle_active: false,
        }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// True while an extra paddle is registered
    pub fn extra_paddle_active(&self) -> bool {
        self.extra_paddle_active
    }

    /// Register an extra paddle unless one already exists
    pub fn spawn_extra_paddle(&mut self, paddle: Paddle) -> Option<EntityId> {
        if self.extra_paddle_active {
            return None;
        }
        let id = self.registry.add(Entity::Paddle(paddle), Layer::Default);
        self.extra_paddle_active = true;
        self.emit(GameEvent::ExtraPaddleSpawned { paddle: id });
        Some(id)
    }

    /// Remove an entity, keeping the extra paddle flag in sync
    pub fn remove_entity(&mut self, id: EntityId, layer: Layer) -> bool {
        let is_extra = self
            .registry
            .get(id)
            .and_then(Entity::as_paddle)
            .is_some_and(Paddle::is_extra);
        let removed = self.registry.remove(id, layer);
        if removed && is_extra {
            self.extra_paddle_active = false;
            self.emit(GameEvent::ExtraPaddleRemoved { paddle: id });
            log::debug!("Extra paddle {id:?} removed");
        }
        removed
    }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub ctx: GameContext,
    pub effects: EffectArena,
    pub phase: GamePhase,
    /// Frames simulated
    pub frame: u64,
    /// Main ball (never destroyed)
    pub ball: EntityId,
    /// Main paddle
    pub paddle: EntityId,
    /// Contact pairs touching at the end of the previous frame
    pub(crate) contacts: HashSet<(EntityId, EntityId)>,
}

impl GameState {
    /// Build a fresh level from settings
    pub fn new(settings: &Settings, assets: &mut dyn AssetProvider) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let mut ctx = GameContext::new(settings.window_dimensions(), seed, settings.starting_lives);
        ctx.extra_paddle_hits = settings.extra_paddle_hits;
        ctx.camera_focus_hits = settings.camera_focus_hits;
        ctx.ball_speed = settings.ball_speed;

        let mut state = Self {
            seed,
            ctx,
            effects: EffectArena::new(),
            phase: GamePhase::Playing,
            frame: 0,
            ball: EntityId(0),
            paddle: EntityId(0),
            contacts: HashSet::new(),
        };
        super::tick::generate_level(&mut state, settings, assets);
        state
    }

    pub fn main_ball(&self) -> Option<&Ball> {
        self.ctx.registry.get(self.ball).and_then(Entity::as_ball)
    }

    pub fn main_paddle(&self) -> Option<&Paddle> {
        self.ctx.registry.get(self.paddle).and_then(Entity::as_paddle)
    }

    /// Send the main ball back to the window center with a random diagonal heading
    pub fn reposition_ball(&mut self) {
        let center = self.ctx.window.dimensions() * 0.5;
        let vel = crate::random_diagonal(&mut self.ctx.rng, self.ctx.ball_speed);
        if let Some(ball) = self.ctx.registry.get_mut(self.ball).and_then(Entity::as_ball_mut) {
            ball.body.center = center;
            ball.body.vel = vel;
        }
    }

    /// Take this frame's events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.ctx.events)
    }

    /// Live pucks
    pub fn puck_count(&self) -> usize {
        self.ctx
            .registry
            .count_where(|e| e.as_ball().is_some_and(Ball::is_puck))
    }

    /// Live extra paddles
    pub fn extra_paddle_count(&self) -> usize {
        self.ctx
            .registry
            .count_where(|e| e.as_paddle().is_some_and(Paddle::is_extra))
    }
}
