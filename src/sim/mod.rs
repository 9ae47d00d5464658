//! Deterministic round simulation
//!
//! All gameplay state lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - No platform, tracker, or rendering dependencies
//! - Mutated only through the tick functions, under a valid task ticket

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{burst_at, collect_hits};
pub use spawn::Spawner;
pub use state::{Bubble, RoundState};
pub use tick::{motion_tick, timer_tick};
