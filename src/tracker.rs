//! Keypoint source contract
//!
//! The camera and the hand pose estimator live outside the game core; this
//! module is the boundary they are consumed through. The estimator yields at
//! most one hand per frame as an ordered set of 21 landmarks (MediaPipe hand
//! model convention); gameplay only ever reads the index fingertip.

use std::fmt;

/// Hand landmark indices (MediaPipe hand landmark model convention)
#[allow(dead_code)]
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Number of landmarks in a complete hand estimate
pub const KEYPOINT_COUNT: usize = 21;

/// A single estimated landmark in the estimator's image coordinate space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Estimator confidence, when the model reports one
    pub confidence: Option<f32>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            confidence: None,
        }
    }
}

/// One frame's hand estimate: the full ordered landmark set
///
/// "No hand visible this frame" is `Option<HandKeypoints>::None` at the
/// estimate call site, never an empty or partial set here.
#[derive(Debug, Clone)]
pub struct HandKeypoints {
    points: Vec<Keypoint>,
}

impl HandKeypoints {
    /// Build from an ordered landmark list; rejects incomplete sets
    pub fn new(points: Vec<Keypoint>) -> Option<Self> {
        if points.len() < KEYPOINT_COUNT {
            return None;
        }
        Some(Self { points })
    }

    /// The index fingertip, the landmark gameplay tracks
    pub fn index_tip(&self) -> Keypoint {
        self.points[landmarks::INDEX_TIP]
    }

    pub fn get(&self, index: usize) -> Option<Keypoint> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Keypoint] {
        &self.points
    }
}

/// Failures at the camera/estimator boundary
///
/// Carries the user-facing message; the underlying platform error detail is
/// logged where it occurs rather than threaded through the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// The hand tracking model failed to initialize
    ModelLoadFailed,
    /// The user denied camera access
    PermissionDenied,
    /// The platform has no camera capture support
    Unsupported,
    /// The camera stream stopped delivering frames mid-session
    StreamLost,
}

impl TrackerError {
    /// Short, specific message for the game-over overlay
    pub fn user_message(&self) -> &'static str {
        match self {
            TrackerError::ModelLoadFailed => {
                "Could not load the hand tracking model. Please try again later."
            }
            TrackerError::PermissionDenied => {
                "Camera access is required to play. Please allow camera permissions and refresh."
            }
            TrackerError::Unsupported => "Your browser does not support camera access.",
            TrackerError::StreamLost => "The camera stream was interrupted.",
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

/// The estimator/camera service consumed by the game
///
/// `estimate` pulls the source's latest camera frame internally and must
/// tolerate being polled slower than the display refresh. Implementations
/// that await a platform promise instead (the browser estimator) skip this
/// trait and feed results straight into [`crate::Engine::frame_tick`].
pub trait KeypointSource {
    /// Load the pose model. Failure is fatal for the session.
    fn initialize(&mut self) -> Result<(), TrackerError>;

    /// Acquire the camera stream. Failure ends the current round.
    fn open_camera(&mut self) -> Result<(), TrackerError>;

    /// Estimate the hand in the latest frame; `None` when no hand is visible
    fn estimate(&mut self) -> Result<Option<HandKeypoints>, TrackerError>;
}
