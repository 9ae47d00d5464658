//! Bubble spawn policy
//!
//! One bubble per spawn tick while a round is active: random horizontal
//! position inside the display, vertical start just below the bottom edge
//! so it drifts into view, size and speed drawn independently from the
//! tuned ranges. Seeded RNG keeps rounds reproducible.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{Bubble, RoundState};
use crate::tuning::Tuning;

/// Randomized bubble factory for one session
#[derive(Debug)]
pub struct Spawner {
    rng: Pcg32,
    display: Vec2,
}

impl Spawner {
    pub fn new(seed: u64, display: Vec2) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            display,
        }
    }

    /// Emit one bubble into the round; returns its id
    pub fn spawn(&mut self, round: &mut RoundState, tuning: &Tuning) -> u32 {
        let (size_min, size_max) = tuning.bubble_size;
        let (speed_min, speed_max) = tuning.bubble_speed;

        let size = self.rng.random_range(size_min..size_max);
        let speed = self.rng.random_range(speed_min..speed_max);
        let x = self.rng.random_range(0.0..self.display.x);
        // Fully below the bottom edge; the motion tick floats it upward
        let y = self.display.y + size;

        let id = round.next_entity_id();
        round.bubbles.push(Bubble {
            id,
            pos: Vec2::new(x, y),
            size,
            speed,
        });
        log::debug!("spawned bubble {} (size {:.0}, speed {:.2})", id, size, speed);
        id
    }
}
