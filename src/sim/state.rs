//! Round state and entity types

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A floating target the player pops with the cursor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bubble {
    /// Unique within the round, never reused
    pub id: u32,
    /// Center position in display space
    pub pos: Vec2,
    /// Diameter
    pub size: f32,
    /// Rise per motion tick
    pub speed: f32,
}

impl Bubble {
    #[inline]
    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    /// Hit test: strictly inside the bubble's radius
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.pos) < self.radius()
    }
}

/// Everything that exists for exactly one round
///
/// `score` only ever grows; `time_remaining` only ever shrinks. Entity ids
/// come from a monotone allocator so a removed id can never reappear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    pub score: u32,
    /// Seconds left, decremented once per timer tick
    pub time_remaining: u32,
    /// Live bubbles (ordered by spawn, ids ascending)
    pub bubbles: Vec<Bubble>,
    next_id: u32,
}

impl RoundState {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            score: 0,
            time_remaining: duration_secs,
            bubbles: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Back to initial values for a fresh round
    pub fn reset(&mut self, duration_secs: u32) {
        *self = Self::new(duration_secs);
    }
}
