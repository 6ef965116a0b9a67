//! Brick effect factory
//!
//! Assigns each brick an effect chain at level build. Each brick draws one of six
//! equally likely outcomes: one of the four special effects, no special effect,
//! or a chain of stacked special effects.

use rand::Rng;

use super::effects::{Effect, EffectArena, EffectId};
use super::registry::Layer;
use crate::consts::assets::*;
use crate::platform::{AssetProvider, ImageHandle, SoundHandle};

/// Number of distinct special effects
pub const NUM_OF_SPECIAL_EFFECTS: u32 = 4;

/// How many times a chain may nest another chain, counting itself. A depth of 2
/// yields two stacked decorators, or three when the inner pick is itself a chain.
pub const MAX_CHAIN_DEPTH: u32 = 2;

/// A decorator the factory can stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialEffect {
    TimeScaleDrop,
    MultiBallSplit,
    ExtraPaddle,
    CameraFocus,
}

impl SpecialEffect {
    pub const ALL: [SpecialEffect; NUM_OF_SPECIAL_EFFECTS as usize] = [
        SpecialEffect::TimeScaleDrop,
        SpecialEffect::MultiBallSplit,
        SpecialEffect::ExtraPaddle,
        SpecialEffect::CameraFocus,
    ];

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..NUM_OF_SPECIAL_EFFECTS) as usize]
    }
}

/// Outcome of the per-brick draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Special(SpecialEffect),
    Chained,
    Plain,
}

impl Choice {
    /// Uniform over the specials, `Chained` and `Plain`
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.random_range(0..NUM_OF_SPECIAL_EFFECTS + 2) {
            n if n < NUM_OF_SPECIAL_EFFECTS => Choice::Special(SpecialEffect::ALL[n as usize]),
            n if n == NUM_OF_SPECIAL_EFFECTS => Choice::Chained,
            _ => Choice::Plain,
        }
    }
}

/// Builds per-brick effect chains around one shared `RemoveBrick`
#[derive(Debug, Clone)]
pub struct StrategyFactory {
    terminal: EffectId,
    puck_image: ImageHandle,
    puck_sound: SoundHandle,
    paddle_image: ImageHandle,
    slow_image: ImageHandle,
    fast_image: ImageHandle,
}

impl StrategyFactory {
    /// Load effect resources and register the shared terminal effect
    pub fn new(arena: &mut EffectArena, assets: &mut dyn AssetProvider) -> Self {
        let terminal = arena.push(Effect::RemoveBrick {
            layer: Layer::StaticObjects,
        });
        Self {
            terminal,
            puck_image: assets.load_image(PUCK_IMAGE, true),
            puck_sound: assets.load_sound(PUCK_SOUND),
            paddle_image: assets.load_image(PADDLE_IMAGE, false),
            slow_image: assets.load_image(SLOW_CLOCK_IMAGE, true),
            fast_image: assets.load_image(FAST_CLOCK_IMAGE, true),
        }
    }

    /// The shared `RemoveBrick` every chain ends in
    pub fn terminal(&self) -> EffectId {
        self.terminal
    }

    /// Draw a chain for one brick
    pub fn build<R: Rng + ?Sized>(&self, arena: &mut EffectArena, rng: &mut R) -> EffectId {
        let id = match Choice::roll(rng) {
            Choice::Plain => self.terminal,
            Choice::Special(special) => self.decorate(arena, special, self.terminal),
            Choice::Chained => self.build_chain(arena, rng, MAX_CHAIN_DEPTH),
        };
        log::trace!("Brick chain {:?}", arena.chain(id));
        id
    }

    /// Wrap `inner` in one decorator
    pub fn decorate(
        &self,
        arena: &mut EffectArena,
        special: SpecialEffect,
        inner: EffectId,
    ) -> EffectId {
        let effect = match special {
            SpecialEffect::TimeScaleDrop => Effect::TimeScaleDrop {
                inner,
                slow_image: self.slow_image,
                fast_image: self.fast_image,
            },
            SpecialEffect::MultiBallSplit => Effect::MultiBallSplit {
                inner,
                puck_image: self.puck_image,
                puck_sound: self.puck_sound,
            },
            SpecialEffect::ExtraPaddle => Effect::ExtraPaddle {
                inner,
                paddle_image: self.paddle_image,
            },
            SpecialEffect::CameraFocus => Effect::CameraFocus { inner, agent: None },
        };
        arena.push(effect)
    }

    /// Stack a random decorator on a random inner pick. While `depth` allows, the
    /// inner pick may itself be a chain.
    fn build_chain<R: Rng + ?Sized>(
        &self,
        arena: &mut EffectArena,
        rng: &mut R,
        depth: u32,
    ) -> EffectId {
        let inner = if depth > 1 {
            match rng.random_range(0..=NUM_OF_SPECIAL_EFFECTS) {
                NUM_OF_SPECIAL_EFFECTS => self.build_chain(arena, rng, depth - 1),
                n => self.decorate(arena, SpecialEffect::ALL[n as usize], self.terminal),
            }
        } else {
            self.decorate(arena, SpecialEffect::random(rng), self.terminal)
        };
        self.decorate(arena, SpecialEffect::random(rng), inner)
    }
}
