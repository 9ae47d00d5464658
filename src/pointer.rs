//! Keypoint-to-screen cursor mapping
//!
//! The estimator reports landmarks in camera image space; gameplay runs in
//! display space with the horizontal axis mirrored so the cursor moves like
//! a reflection of the player's hand. Detection is frame-to-frame noisy, so
//! a miss holds the cursor at its last known position instead of hiding it
//! or snapping to the origin.

use glam::Vec2;

use crate::tracker::{HandKeypoints, Keypoint};

/// One tick's cursor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSample {
    /// Cursor position in display space
    pub pos: Vec2,
    /// Whether this position came from a detection this tick (held
    /// positions never drive collision)
    pub fresh: bool,
}

/// Maps raw keypoints into a mirrored display-space cursor
#[derive(Debug, Clone)]
pub struct PointerMapper {
    image: Vec2,
    display: Vec2,
    last: Option<Vec2>,
}

impl PointerMapper {
    pub fn new(image: Vec2, display: Vec2) -> Self {
        Self {
            image,
            display,
            last: None,
        }
    }

    /// Mirror + scale a keypoint into display space
    #[inline]
    pub fn map(&self, kp: Keypoint) -> Vec2 {
        Vec2::new(
            self.display.x - (kp.x / self.image.x) * self.display.x,
            (kp.y / self.image.y) * self.display.y,
        )
    }

    /// Feed one tick's estimate; returns the current cursor, if any
    ///
    /// `None` detection keeps the previous position (marked stale). Before
    /// the first detection of a round there is no cursor at all.
    pub fn observe(&mut self, hand: Option<&HandKeypoints>) -> Option<CursorSample> {
        match hand {
            Some(hand) => {
                let pos = self.map(hand.index_tip());
                self.last = Some(pos);
                Some(CursorSample { pos, fresh: true })
            }
            None => self.last.map(|pos| CursorSample { pos, fresh: false }),
        }
    }

    /// Forget the held position (cursor state is per-round)
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn display(&self) -> Vec2 {
        self.display
    }
}
