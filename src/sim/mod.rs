//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies beyond asset handles

pub mod collision;
pub mod countdown;
pub mod effects;
pub mod factory;
pub mod pickup;
pub mod registry;
pub mod state;
pub mod tick;

pub use collision::CollisionResult;
pub use countdown::{AgentState, CountdownAgent};
pub use effects::{Effect, EffectArena, EffectId, EffectKind, Hit};
pub use factory::{Choice, SpecialEffect, StrategyFactory};
pub use pickup::Pickup;
pub use registry::{Entity, EntityId, Layer, ObjectRegistry};
pub use state::{
    Ball, BallKind, Body, Brick, Camera, GameContext, GameEvent, GamePhase, GameState, Paddle,
    PaddleKind, Window,
};
pub use tick::{TickInput, generate_level, tick};
