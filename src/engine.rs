//! Per-tick orchestration
//!
//! The engine wires the session state machine, the round simulation, the
//! pointer mapper, and the presentation surface together. Every tick entry
//! point takes a [`TaskTicket`] and silently drops work whose ticket is
//! stale, so a callback (or an estimate result still in flight) from a
//! finished round can never mutate the current one.
//!
//! Within a frame tick the order is fixed: pointer mapping, then collision,
//! then the presentation push.

use glam::Vec2;

use crate::pointer::PointerMapper;
use crate::presentation::{CursorUpdate, FrameUpdate, PhaseChange, PresentationSurface};
use crate::session::{Phase, Session, SessionEvent, Task, TaskTicket, Transition};
use crate::sim::{self, RoundState, Spawner};
use crate::tracker::{HandKeypoints, KeypointSource};
use crate::tuning::Tuning;

/// The game core, generic over what renders it
pub struct Engine<P: PresentationSurface> {
    session: Session,
    round: RoundState,
    spawner: Spawner,
    pointer: PointerMapper,
    tuning: Tuning,
    presenter: P,
}

impl<P: PresentationSurface> Engine<P> {
    /// `image` is the estimator's coordinate space, `display` the screen's
    pub fn new(tuning: Tuning, image: Vec2, display: Vec2, seed: u64, presenter: P) -> Self {
        let tuning = tuning.sanitized();
        let round = RoundState::new(tuning.round_duration_secs);
        Self {
            session: Session::new(),
            round,
            spawner: Spawner::new(seed, display),
            pointer: PointerMapper::new(image, display),
            tuning,
            presenter,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Route an event through the state machine and react to the outcome
    pub fn handle(&mut self, event: SessionEvent) {
        if let Some(transition) = self.session.handle(event) {
            let starts_round = transition.to == Phase::Playing;
            // Play Again wipes the finished round immediately
            let leaves_game_over = transition.from == Phase::GameOver
                && matches!(transition.to, Phase::Ready | Phase::WaitingForCamera);
            if starts_round || leaves_game_over {
                // Round state is per-round; the cursor too
                self.round.reset(self.tuning.round_duration_secs);
                self.pointer.reset();
            }
            self.notify_phase(transition);
        }
    }

    /// Ticket for scheduling one of the round tasks; `None` unless `Playing`
    pub fn ticket(&self, task: Task) -> Option<TaskTicket> {
        self.session.ticket(task)
    }

    /// Advance bubble motion and expiry
    pub fn motion_tick(&mut self, ticket: TaskTicket) {
        if !self.accept(ticket, Task::Motion) {
            return;
        }
        sim::motion_tick(&mut self.round);
        // Keep rendering at motion cadence so smoothness never waits on
        // the estimator
        self.present(CursorUpdate::Unchanged);
    }

    /// Emit one new bubble
    pub fn spawn_tick(&mut self, ticket: TaskTicket) {
        if !self.accept(ticket, Task::Spawn) {
            return;
        }
        self.spawner.spawn(&mut self.round, &self.tuning);
    }

    /// One second of countdown; fires the round-over transition at zero
    pub fn timer_tick(&mut self, ticket: TaskTicket) {
        if !self.accept(ticket, Task::Timer) {
            return;
        }
        if sim::timer_tick(&mut self.round) {
            self.handle(SessionEvent::RoundExpired);
        }
    }

    /// Apply one completed estimate: map the pointer, hit-test, present
    ///
    /// `hand` is `None` on a transient detection miss; the cursor holds its
    /// last position and held positions never drive collision.
    pub fn frame_tick(&mut self, ticket: TaskTicket, hand: Option<HandKeypoints>) {
        if !self.accept(ticket, Task::FrameLoop) {
            return;
        }

        let sample = self.pointer.observe(hand.as_ref());
        if let Some(sample) = sample {
            if sample.fresh {
                sim::burst_at(&mut self.round, sample.pos);
            }
        }

        let cursor = match sample {
            Some(sample) => CursorUpdate::Moved(sample.pos),
            None => CursorUpdate::Unchanged,
        };
        self.present(cursor);
    }

    /// Pull one estimate from a synchronous source and apply it
    ///
    /// Estimator errors are recovered here: translated into a session event,
    /// never propagated into the simulation.
    pub fn drive_frame<S: KeypointSource>(&mut self, source: &mut S) {
        let Some(ticket) = self.ticket(Task::FrameLoop) else {
            return;
        };
        match source.estimate() {
            Ok(hand) => self.frame_tick(ticket, hand),
            Err(err) => {
                log::error!("estimate failed: {}", err);
                self.handle(SessionEvent::StreamLost(err));
            }
        }
    }

    fn accept(&self, ticket: TaskTicket, task: Task) -> bool {
        if ticket.task() != task {
            log::warn!("{:?} ticket used for a {:?} tick", ticket.task(), task);
            return false;
        }
        if !self.session.accepts(ticket) {
            log::debug!("discarding stale {:?} tick", task);
            return false;
        }
        true
    }

    fn present(&mut self, cursor: CursorUpdate) {
        let frame = FrameUpdate {
            cursor,
            bubbles: &self.round.bubbles,
            score: self.round.score,
            time_remaining: self.round.time_remaining,
        };
        self.presenter.present(&frame);
    }

    fn notify_phase(&mut self, transition: Transition) {
        let change = PhaseChange {
            from: transition.from,
            to: transition.to,
            score: self.round.score,
            message: self.session.failure().map(|f| f.message()),
            can_play_again: self.session.can_play_again(),
        };
        self.presenter.phase_changed(&change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{Keypoint, TrackerError, KEYPOINT_COUNT};
    use std::collections::VecDeque;

    const IMAGE: Vec2 = Vec2::new(640.0, 480.0);
    const DISPLAY: Vec2 = Vec2::new(640.0, 480.0);

    #[derive(Debug, Clone)]
    struct PhaseRecord {
        to: Phase,
        score: u32,
        message: Option<String>,
        can_play_again: bool,
    }

    #[derive(Debug, Clone)]
    struct FrameRecord {
        cursor: CursorUpdate,
        bubble_count: usize,
        score: u32,
        time_remaining: u32,
    }

    /// Presenter that records everything pushed to it
    #[derive(Default)]
    struct Recorder {
        frames: Vec<FrameRecord>,
        phases: Vec<PhaseRecord>,
    }

    impl PresentationSurface for Recorder {
        fn present(&mut self, frame: &FrameUpdate<'_>) {
            self.frames.push(FrameRecord {
                cursor: frame.cursor,
                bubble_count: frame.bubbles.len(),
                score: frame.score,
                time_remaining: frame.time_remaining,
            });
        }

        fn phase_changed(&mut self, change: &PhaseChange<'_>) {
            self.phases.push(PhaseRecord {
                to: change.to,
                score: change.score,
                message: change.message.map(str::to_owned),
                can_play_again: change.can_play_again,
            });
        }
    }

    /// Scripted estimator for drive_frame tests
    struct ScriptedSource {
        results: VecDeque<Result<Option<HandKeypoints>, TrackerError>>,
    }

    impl KeypointSource for ScriptedSource {
        fn initialize(&mut self) -> Result<(), TrackerError> {
            Ok(())
        }
        fn open_camera(&mut self) -> Result<(), TrackerError> {
            Ok(())
        }
        fn estimate(&mut self) -> Result<Option<HandKeypoints>, TrackerError> {
            self.results.pop_front().unwrap_or(Ok(None))
        }
    }

    fn new_engine() -> Engine<Recorder> {
        Engine::new(Tuning::default(), IMAGE, DISPLAY, 12345, Recorder::default())
    }

    fn playing_engine() -> Engine<Recorder> {
        let mut eng = new_engine();
        eng.handle(SessionEvent::ModelLoaded);
        eng.handle(SessionEvent::CameraReady);
        eng.handle(SessionEvent::StartGame);
        eng.handle(SessionEvent::BeginRound);
        assert_eq!(eng.phase(), Phase::Playing);
        eng
    }

    /// A hand whose index tip maps (through mirror + scale) onto `target`
    fn hand_for_cursor(target: Vec2) -> HandKeypoints {
        let kp = Keypoint::new(
            (DISPLAY.x - target.x) / DISPLAY.x * IMAGE.x,
            target.y / DISPLAY.y * IMAGE.y,
        );
        HandKeypoints::new(vec![kp; KEYPOINT_COUNT]).unwrap()
    }

    #[test]
    fn test_round_starts_from_initial_values() {
        let eng = playing_engine();
        assert_eq!(eng.round().score, 0);
        assert_eq!(eng.round().time_remaining, 30);
        assert!(eng.round().bubbles.is_empty());
    }

    #[test]
    fn test_full_round_scenario() {
        // Spawn once, pop it, run the clock out: GameOver with score 1
        let mut eng = playing_engine();

        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        assert_eq!(eng.round().bubbles.len(), 1);
        assert_eq!(eng.round().score, 0);

        let t = eng.ticket(Task::Motion).unwrap();
        eng.motion_tick(t);

        let target = eng.round().bubbles[0].pos;
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, Some(hand_for_cursor(target)));
        assert_eq!(eng.round().score, 1);
        assert!(eng.round().bubbles.is_empty());

        // The frame pushed after the hit already reflects it
        let last = eng.presenter().frames.last().unwrap();
        assert_eq!(last.score, 1);
        assert_eq!(last.bubble_count, 0);

        for _ in 0..30 {
            let Some(t) = eng.ticket(Task::Timer) else {
                break;
            };
            eng.timer_tick(t);
        }
        assert_eq!(eng.phase(), Phase::GameOver);
        assert_eq!(eng.round().score, 1);

        // Exactly one GameOver notification, carrying the final score
        let game_overs: Vec<_> = eng
            .presenter()
            .phases
            .iter()
            .filter(|p| p.to == Phase::GameOver)
            .collect();
        assert_eq!(game_overs.len(), 1);
        assert_eq!(game_overs[0].score, 1);
    }

    const ROUND_TICK_LIMIT: usize = 100;

    #[test]
    fn test_timer_expiry_fires_game_over_exactly_once() {
        let mut eng = playing_engine();
        for _ in 0..ROUND_TICK_LIMIT {
            let Some(t) = eng.ticket(Task::Timer) else {
                break;
            };
            eng.timer_tick(t);
        }
        assert_eq!(eng.phase(), Phase::GameOver);
        // No ticket exists anymore, so no further tick can fire
        assert!(eng.ticket(Task::Timer).is_none());
    }

    #[test]
    fn test_stale_frame_result_is_discarded() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let target = eng.round().bubbles[0].pos;

        // Estimate was requested, then the player exited mid-flight
        let in_flight = eng.ticket(Task::FrameLoop).unwrap();
        eng.handle(SessionEvent::Exit);

        let frames_before = eng.presenter().frames.len();
        eng.frame_tick(in_flight, Some(hand_for_cursor(target)));

        assert_eq!(eng.round().score, 0);
        assert_eq!(eng.presenter().frames.len(), frames_before);
    }

    #[test]
    fn test_stale_interval_ticks_are_discarded() {
        let mut eng = playing_engine();
        let motion = eng.ticket(Task::Motion).unwrap();
        let spawn = eng.ticket(Task::Spawn).unwrap();
        let timer = eng.ticket(Task::Timer).unwrap();

        eng.handle(SessionEvent::Exit);

        eng.spawn_tick(spawn);
        eng.motion_tick(motion);
        eng.timer_tick(timer);

        assert!(eng.round().bubbles.is_empty());
        assert_eq!(eng.round().time_remaining, 30);
    }

    #[test]
    fn test_ticket_for_wrong_task_is_rejected() {
        let mut eng = playing_engine();
        let motion = eng.ticket(Task::Motion).unwrap();
        // Using a motion ticket to drive the timer does nothing
        eng.timer_tick(motion);
        assert_eq!(eng.round().time_remaining, 30);
    }

    #[test]
    fn test_detection_miss_holds_cursor_and_skips_collision() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let target = eng.round().bubbles[0].pos;

        // No hand yet: no cursor at all
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, None);
        assert_eq!(
            eng.presenter().frames.last().unwrap().cursor,
            CursorUpdate::Unchanged
        );

        // Detection over the bubble pops it
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, Some(hand_for_cursor(target)));
        assert_eq!(eng.round().score, 1);

        // Another miss: the cursor holds position but pops nothing new
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, None);
        assert_eq!(eng.round().score, 1);
        match eng.presenter().frames.last().unwrap().cursor {
            CursorUpdate::Moved(_) => {}
            CursorUpdate::Unchanged => panic!("held cursor should still be reported"),
        }
    }

    #[test]
    fn test_init_failure_reaches_game_over_without_play_again() {
        let mut eng = new_engine();
        eng.handle(SessionEvent::ModelFailed(TrackerError::ModelLoadFailed));
        assert_eq!(eng.phase(), Phase::GameOver);

        let last = eng.presenter().phases.last().unwrap();
        assert!(!last.can_play_again);
        assert_eq!(
            last.message.as_deref(),
            Some(TrackerError::ModelLoadFailed.user_message())
        );

        // Play Again goes nowhere
        eng.handle(SessionEvent::PlayAgain);
        assert_eq!(eng.phase(), Phase::GameOver);
    }

    #[test]
    fn test_stream_loss_mid_round_preserves_score() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let target = eng.round().bubbles[0].pos;
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, Some(hand_for_cursor(target)));
        assert_eq!(eng.round().score, 1);

        eng.handle(SessionEvent::StreamLost(TrackerError::StreamLost));
        assert_eq!(eng.phase(), Phase::GameOver);

        let last = eng.presenter().phases.last().unwrap();
        assert_eq!(last.score, 1);
        assert!(last.can_play_again);
        assert_eq!(
            last.message.as_deref(),
            Some(TrackerError::StreamLost.user_message())
        );
    }

    #[test]
    fn test_play_again_resets_the_round() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let target = eng.round().bubbles[0].pos;
        let t = eng.ticket(Task::FrameLoop).unwrap();
        eng.frame_tick(t, Some(hand_for_cursor(target)));

        eng.handle(SessionEvent::RoundExpired);
        eng.handle(SessionEvent::PlayAgain);
        assert_eq!(eng.phase(), Phase::Ready);
        eng.handle(SessionEvent::StartGame);
        eng.handle(SessionEvent::BeginRound);

        assert_eq!(eng.round().score, 0);
        assert_eq!(eng.round().time_remaining, 30);
        assert!(eng.round().bubbles.is_empty());
    }

    #[test]
    fn test_double_exit_produces_no_second_notification() {
        let mut eng = playing_engine();
        eng.handle(SessionEvent::Exit);
        let phases = eng.presenter().phases.len();
        eng.handle(SessionEvent::Exit);
        assert_eq!(eng.presenter().phases.len(), phases);
        assert_eq!(eng.phase(), Phase::Exited);
    }

    #[test]
    fn test_drive_frame_applies_estimates_and_recovers_errors() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let target = eng.round().bubbles[0].pos;

        let mut source = ScriptedSource {
            results: VecDeque::from([
                Ok(Some(hand_for_cursor(target))),
                Ok(None),
                Err(TrackerError::StreamLost),
            ]),
        };

        eng.drive_frame(&mut source);
        assert_eq!(eng.round().score, 1);

        eng.drive_frame(&mut source);
        assert_eq!(eng.round().score, 1);

        eng.drive_frame(&mut source);
        assert_eq!(eng.phase(), Phase::GameOver);

        // Once over, drive_frame is a no-op
        eng.drive_frame(&mut source);
        assert_eq!(eng.phase(), Phase::GameOver);
    }

    #[test]
    fn test_motion_tick_presents_at_motion_cadence() {
        let mut eng = playing_engine();
        let t = eng.ticket(Task::Spawn).unwrap();
        eng.spawn_tick(t);
        let y_before = eng.round().bubbles[0].pos.y;

        let frames_before = eng.presenter().frames.len();
        let t = eng.ticket(Task::Motion).unwrap();
        eng.motion_tick(t);

        assert!(eng.round().bubbles[0].pos.y < y_before);
        assert_eq!(eng.presenter().frames.len(), frames_before + 1);

        let last = eng.presenter().frames.last().unwrap();
        assert_eq!(last.time_remaining, 30);
        assert_eq!(last.bubble_count, 1);
    }
}
