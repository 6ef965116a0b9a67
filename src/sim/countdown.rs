//! Ball collision countdown
//!
//! An invisible registry entity that watches a ball's hit counter and calls back
//! into the camera effect that created it once enough impacts have happened.

use serde::{Deserialize, Serialize};

use super::effects::{EffectArena, EffectId};
use super::registry::{Entity, EntityId};
use super::state::GameContext;

/// Lifecycle of a countdown agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting for the ball to pass the target
    Armed,
    /// Target passed, owner callback due
    Triggered,
    /// Callback done, agent out of the registry
    Detached,
}

/// Counts impacts of one ball since attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownAgent {
    ball: EntityId,
    owner: EffectId,
    target: u32,
    state: AgentState,
}

impl CountdownAgent {
    /// Arm against `ball`, whose counter currently reads `ball_hits`
    pub fn new(ball: EntityId, ball_hits: u32, owner: EffectId, countdown: u32) -> Self {
        Self {
            ball,
            owner,
            target: ball_hits.saturating_add(countdown),
            state: AgentState::Armed,
        }
    }

    pub fn ball(&self) -> EntityId {
        self.ball
    }

    pub fn owner(&self) -> EffectId {
        self.owner
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Compare the live counter to the target. Returns true exactly once, on the
    /// frame the counter first exceeds the target.
    pub fn poll(&mut self, ball_hits: u32) -> bool {
        if self.state == AgentState::Armed && ball_hits > self.target {
            self.state = AgentState::Triggered;
            return true;
        }
        false
    }

    pub fn detach(&mut self) {
        self.state = AgentState::Detached;
    }
}

/// Per-frame update of the agent registered as `id`
pub fn update_agent(id: EntityId, ctx: &mut GameContext, effects: &mut EffectArena) {
    let Some(ball) = ctx.registry.get(id).and_then(Entity::as_countdown).map(CountdownAgent::ball)
    else {
        return;
    };
    // A vanished ball can never reach the target; release right away
    let hits = ctx
        .registry
        .get(ball)
        .and_then(Entity::as_ball)
        .map_or(u32::MAX, |b| b.collision_counter());

    let mut fired = None;
    if let Some(Entity::Countdown(agent)) = ctx.registry.get_mut(id) {
        if agent.poll(hits) {
            fired = Some(agent.owner());
        }
    }
    if let Some(owner) = fired {
        log::debug!("Countdown {id:?} fired after ball reached {hits} hits");
        effects.release_camera(owner, ctx);
    }
}
