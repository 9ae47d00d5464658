//! Presentation surface contract
//!
//! The core never renders; it pushes immutable snapshots of the round and
//! phase changes to whatever implements [`PresentationSurface`] - a canvas
//! presenter in the browser, a recording stub in tests. Decoupling the
//! snapshot from the renderer keeps simulation correctness independent of
//! any particular rendering technology.

use glam::Vec2;
use serde::Serialize;

use crate::session::Phase;
use crate::sim::Bubble;

/// Cursor portion of a frame snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CursorUpdate {
    /// Fresh or held position in display space
    Moved(Vec2),
    /// Cursor not resampled this tick (or no position known yet this round)
    Unchanged,
}

/// One tick's worth of round state, pushed while `Playing`
#[derive(Debug, Clone, Serialize)]
pub struct FrameUpdate<'a> {
    pub cursor: CursorUpdate,
    pub bubbles: &'a [Bubble],
    pub score: u32,
    pub time_remaining: u32,
}

/// A phase change plus everything the UI needs to react to it
#[derive(Debug, Clone, Copy)]
pub struct PhaseChange<'a> {
    pub from: Phase,
    pub to: Phase,
    /// Score as of the transition (the final score when entering `GameOver`)
    pub score: u32,
    /// User-visible failure message, when one is on record
    pub message: Option<&'a str>,
    /// Whether "Play Again" should be offered
    pub can_play_again: bool,
}

/// Receiver for core output
pub trait PresentationSurface {
    /// Called once per tick during `Playing`
    fn present(&mut self, frame: &FrameUpdate<'_>);

    /// Called on every phase transition
    fn phase_changed(&mut self, change: &PhaseChange<'_>);
}
