//! Object registry
//!
//! The single shared collection of live entities. Iteration is in id order, which
//! is also insertion order, so every frame visits entities deterministically.
//!
//! Removal is two-phase: `remove` marks an entity dead right away (and reports
//! whether it was alive), `flush` drops dead entries at the end of the frame.
//! Entities removed mid-frame can still receive the rest of that frame's
//! collision events through `get_mut_any`.

use serde::{Deserialize, Serialize};

use super::countdown::CountdownAgent;
use super::pickup::Pickup;
use super::state::{Ball, Body, Brick, Paddle};

/// Stable identifier of a registered entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Registry layer an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Background,
    /// Moving and colliding objects: balls, pucks, paddles, walls, pickups
    Default,
    /// Bricks
    StaticObjects,
}

/// Anything the registry can hold
#[derive(Debug, Clone)]
pub enum Entity {
    Wall(Body),
    Ball(Ball),
    Paddle(Paddle),
    Brick(Brick),
    Pickup(Pickup),
    Countdown(CountdownAgent),
}

/// Collision role of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderKind {
    Wall,
    Ball,
    Paddle,
    Brick,
    Pickup,
}

impl Entity {
    pub fn body(&self) -> Option<&Body> {
        match self {
            Entity::Wall(body) => Some(body),
            Entity::Ball(ball) => Some(&ball.body),
            Entity::Paddle(paddle) => Some(&paddle.body),
            Entity::Brick(brick) => Some(&brick.body),
            Entity::Pickup(pickup) => Some(&pickup.body),
            Entity::Countdown(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        match self {
            Entity::Wall(body) => Some(body),
            Entity::Ball(ball) => Some(&mut ball.body),
            Entity::Paddle(paddle) => Some(&mut paddle.body),
            Entity::Brick(brick) => Some(&mut brick.body),
            Entity::Pickup(pickup) => Some(&mut pickup.body),
            Entity::Countdown(_) => None,
        }
    }

    /// Collision role; invisible entities have none
    pub fn collider(&self) -> Option<ColliderKind> {
        match self {
            Entity::Wall(_) => Some(ColliderKind::Wall),
            Entity::Ball(_) => Some(ColliderKind::Ball),
            Entity::Paddle(_) => Some(ColliderKind::Paddle),
            Entity::Brick(_) => Some(ColliderKind::Brick),
            Entity::Pickup(_) => Some(ColliderKind::Pickup),
            Entity::Countdown(_) => None,
        }
    }

    pub fn as_ball(&self) -> Option<&Ball> {
        match self {
            Entity::Ball(ball) => Some(ball),
            _ => None,
        }
    }

    pub fn as_ball_mut(&mut self) -> Option<&mut Ball> {
        match self {
            Entity::Ball(ball) => Some(ball),
            _ => None,
        }
    }

    pub fn as_paddle(&self) -> Option<&Paddle> {
        match self {
            Entity::Paddle(paddle) => Some(paddle),
            _ => None,
        }
    }

    pub fn as_brick(&self) -> Option<&Brick> {
        match self {
            Entity::Brick(brick) => Some(brick),
            _ => None,
        }
    }

    pub fn as_pickup(&self) -> Option<&Pickup> {
        match self {
            Entity::Pickup(pickup) => Some(pickup),
            _ => None,
        }
    }

    pub fn as_countdown(&self) -> Option<&CountdownAgent> {
        match self {
            Entity::Countdown(agent) => Some(agent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    id: EntityId,
    layer: Layer,
    alive: bool,
    entity: Entity,
}

/// Shared collection of all game entities
#[derive(Debug, Clone)]
pub struct ObjectRegistry {
    /// Sorted by id
    slots: Vec<Slot>,
    next_id: u32,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
        }
    }

    /// Register an entity in a layer
    pub fn add(&mut self, entity: Entity, layer: Layer) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            id,
            layer,
            alive: true,
            entity,
        });
        id
    }

    /// Remove an entity from a layer.
    ///
    /// Returns false if the entity is not alive in that layer, so repeated
    /// removals are harmless.
    pub fn remove(&mut self, id: EntityId, layer: Layer) -> bool {
        match self.index_of(id) {
            Some(i) if self.slots[i].alive && self.slots[i].layer == layer => {
                self.slots[i].alive = false;
                true
            }
            _ => false,
        }
    }

    /// Drop entries removed during this frame
    pub fn flush(&mut self) {
        self.slots.retain(|slot| slot.alive);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some_and(|i| self.slots[i].alive)
    }

    /// Layer of a live entity
    pub fn layer_of(&self, id: EntityId) -> Option<Layer> {
        self.index_of(id)
            .filter(|&i| self.slots[i].alive)
            .map(|i| self.slots[i].layer)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id)
            .filter(|&i| self.slots[i].alive)
            .map(|i| &self.slots[i].entity)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let i = self.index_of(id).filter(|&i| self.slots[i].alive)?;
        Some(&mut self.slots[i].entity)
    }

    /// Access an entity even if it was removed earlier this frame
    pub fn get_mut_any(&mut self, id: EntityId) -> Option<&mut Entity> {
        let i = self.index_of(id)?;
        Some(&mut self.slots[i].entity)
    }

    /// Live entities in id order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, Layer, &Entity)> {
        self.slots
            .iter()
            .filter(|slot| slot.alive)
            .map(|slot| (slot.id, slot.layer, &slot.entity))
    }

    /// Snapshot of live ids, safe to hold while mutating the registry
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _, _)| id).collect()
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count live entities matching a predicate
    pub fn count_where(&self, pred: impl Fn(&Entity) -> bool) -> usize {
        self.iter().filter(|(_, _, entity)| pred(entity)).count()
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.slots.binary_search_by_key(&id, |slot| slot.id).ok()
    }
}
