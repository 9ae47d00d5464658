//! Motion and timer ticks
//!
//! Bubble motion runs on its own high-frequency cadence, decoupled from the
//! estimator so visual smoothness never waits on inference. Expiry happens
//! here, before any hit test that lands on the same instant; hit-testing
//! lives in [`super::collision`] and runs on the frame loop's cadence.

use super::state::RoundState;

/// Advance every bubble one step and drop the ones that floated off-screen
///
/// Expiry is pure cleanup, never scored.
pub fn motion_tick(round: &mut RoundState) {
    for bubble in &mut round.bubbles {
        bubble.pos.y -= bubble.speed;
    }
    round.bubbles.retain(|b| b.pos.y > -b.size);
}

/// One second of countdown; returns true the moment the round is over
pub fn timer_tick(round: &mut RoundState) -> bool {
    round.time_remaining = round.time_remaining.saturating_sub(1);
    round.time_remaining == 0
}
