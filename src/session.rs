//! Session lifecycle state machine
//!
//! The session phase is owned here and nowhere else; every other component
//! requests transitions through [`SessionEvent`] and reads the phase to
//! decide whether to run. The scoped task registry is the epoch mechanism:
//! tickets for the four round tasks (frame loop, motion, spawn, timer) are
//! only issued while `Playing`, and every transition bumps the epoch so any
//! callback scheduled before it - including an estimate still in flight -
//! fails validation instead of touching round state.

use serde::{Deserialize, Serialize};

use crate::tracker::TrackerError;

/// Game lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Pose model is initializing
    LoadingModel,
    /// Model ready, waiting for the camera stream to deliver frames
    WaitingForCamera,
    /// Everything acquired, waiting for the player to start
    Ready,
    /// Instructions screen
    HowToPlay,
    /// Active round: the only phase with registered round tasks
    Playing,
    /// Round ended (timer expiry or a recorded failure)
    GameOver,
    /// Player left the game; terminal
    Exited,
}

/// What put the session into a failed `GameOver`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Estimator never initialized; Play Again is disabled
    Initialization,
    /// Camera denied/unsupported/lost; Play Again re-attempts acquisition
    Camera,
}

/// A recorded boundary failure with its user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameFailure {
    pub kind: FailureKind,
    pub error: TrackerError,
}

impl GameFailure {
    pub fn message(&self) -> &'static str {
        self.error.user_message()
    }
}

/// Requests for a phase transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Estimator finished initializing
    ModelLoaded,
    /// Estimator failed to initialize (fatal for the session)
    ModelFailed(TrackerError),
    /// Video stream began delivering frames
    CameraReady,
    /// Camera permission denied or capture unsupported
    CameraFailed(TrackerError),
    /// User pressed "Start Game"
    StartGame,
    /// User pressed "Let's Go"
    BeginRound,
    /// Round timer reached zero
    RoundExpired,
    /// Camera stream died after acquisition
    StreamLost(TrackerError),
    /// User pressed "Play Again"
    PlayAgain,
    /// User left the game
    Exit,
}

/// The four recurring tasks scoped to `Playing`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    FrameLoop,
    Motion,
    Spawn,
    Timer,
}

/// Proof that a callback was scheduled for the current round
///
/// Obtained via [`Session::ticket`] and validated on every tick; a bumped
/// epoch invalidates all outstanding tickets at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTicket {
    task: Task,
    epoch: u64,
}

impl TaskTicket {
    pub fn task(&self) -> Task {
        self.task
    }
}

/// A completed phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
}

/// The state machine itself
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    epoch: u64,
    model_ready: bool,
    camera_live: bool,
    failure: Option<GameFailure>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::LoadingModel,
            epoch: 0,
            model_ready: false,
            camera_live: false,
            failure: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn failure(&self) -> Option<&GameFailure> {
        self.failure.as_ref()
    }

    /// Play Again needs a successfully initialized estimator
    pub fn can_play_again(&self) -> bool {
        self.model_ready
    }

    /// Issue a ticket for a round task; `None` outside `Playing`
    pub fn ticket(&self, task: Task) -> Option<TaskTicket> {
        (self.phase == Phase::Playing).then_some(TaskTicket {
            task,
            epoch: self.epoch,
        })
    }

    /// Whether a previously issued ticket is still for the current round
    pub fn accepts(&self, ticket: TaskTicket) -> bool {
        self.phase == Phase::Playing && ticket.epoch == self.epoch
    }

    /// Apply an event; returns the transition if the phase changed
    ///
    /// Events illegal for the current phase are logged and dropped - the
    /// machine never panics on out-of-order input from the platform.
    pub fn handle(&mut self, event: SessionEvent) -> Option<Transition> {
        use Phase::*;
        use SessionEvent::*;

        match (self.phase, event) {
            // Exit works from anywhere and is idempotent
            (Exited, Exit) => None,
            (_, Exit) => self.goto(Exited),

            (LoadingModel, ModelLoaded) => {
                self.model_ready = true;
                self.goto(WaitingForCamera)
            }
            (LoadingModel, ModelFailed(error)) => {
                self.fail(FailureKind::Initialization, error)
            }

            (WaitingForCamera, CameraReady) => {
                self.camera_live = true;
                self.goto(Ready)
            }
            (WaitingForCamera, CameraFailed(error)) => self.fail(FailureKind::Camera, error),

            (Ready, StartGame) => self.goto(HowToPlay),
            (HowToPlay, BeginRound) => self.goto(Playing),
            (Playing, RoundExpired) => self.goto(GameOver),

            // The stream can die any time after acquisition; mid-round this
            // ends the round with the score preserved
            (Ready | HowToPlay | Playing, StreamLost(error)) => {
                self.fail(FailureKind::Camera, error)
            }

            (GameOver, PlayAgain) => {
                if !self.model_ready {
                    log::warn!("Play Again refused: estimator never initialized");
                    return None;
                }
                self.failure = None;
                if self.camera_live {
                    self.goto(Ready)
                } else {
                    self.goto(WaitingForCamera)
                }
            }

            (phase, event) => {
                log::warn!("ignoring {:?} in phase {:?}", event, phase);
                None
            }
        }
    }

    fn fail(&mut self, kind: FailureKind, error: TrackerError) -> Option<Transition> {
        if kind == FailureKind::Camera {
            self.camera_live = false;
        }
        self.failure = Some(GameFailure { kind, error });
        log::error!("{:?} failure: {}", kind, error);
        self.goto(Phase::GameOver)
    }

    fn goto(&mut self, to: Phase) -> Option<Transition> {
        let from = std::mem::replace(&mut self.phase, to);
        // Invalidate every outstanding ticket, whatever the direction
        self.epoch += 1;
        log::info!("phase {:?} -> {:?}", from, to);
        Some(Transition { from, to })
    }
}
