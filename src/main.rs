//! Bubble Burst entry point
//!
//! Handles platform-specific initialization: camera acquisition, estimator
//! interop, the frame loop, and the DOM/canvas presenter.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{spawn_local, JsFuture};
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlVideoElement, MediaStream,
    };

    use bubble_burst::presentation::{CursorUpdate, FrameUpdate, PhaseChange, PresentationSurface};
    use bubble_burst::session::Task;
    use bubble_burst::tracker::{HandKeypoints, Keypoint, TrackerError};
    use bubble_burst::{Engine, Phase, SessionEvent, Tuning};

    // JS bindings for the handpose estimator. The tfjs + handpose scripts
    // are loaded by the page; wasm only drives them.
    #[wasm_bindgen(inline_js = "
        export async function init_hand_model() {
            const tf = window.tf;
            const handpose = window.handpose;
            if (!tf || !handpose) {
                throw new Error('tfjs/handpose scripts not present on the page');
            }
            await tf.setBackend('webgl');
            window.__bubble_hand_model = await handpose.load();
        }
        export async function estimate_hand(video) {
            const model = window.__bubble_hand_model;
            if (!model) return null;
            const predictions = await model.estimateHands(video);
            if (!predictions.length) return null;
            return new Float32Array(predictions[0].landmarks.flat());
        }
    ")]
    extern "C" {
        fn init_hand_model() -> js_sys::Promise;
        fn estimate_hand(video: &HtmlVideoElement) -> js_sys::Promise;
    }

    /// Canvas + DOM presenter: bubbles and cursor on the canvas, HUD and
    /// phase overlays in the DOM
    struct DomPresenter {
        ctx: CanvasRenderingContext2d,
        document: Document,
        display: Vec2,
        cursor: Option<Vec2>,
    }

    impl DomPresenter {
        fn new(ctx: CanvasRenderingContext2d, document: Document, display: Vec2) -> Self {
            Self {
                ctx,
                document,
                display,
                cursor: None,
            }
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_class(&self, id: &str, class: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("class", class);
            }
        }

        fn clear_canvas(&self) {
            self.ctx
                .clear_rect(0.0, 0.0, self.display.x as f64, self.display.y as f64);
        }
    }

    impl PresentationSurface for DomPresenter {
        fn present(&mut self, frame: &FrameUpdate<'_>) {
            if let CursorUpdate::Moved(pos) = frame.cursor {
                self.cursor = Some(pos);
            }

            self.clear_canvas();

            self.ctx.set_fill_style_str("rgba(0, 200, 255, 0.7)");
            for bubble in frame.bubbles {
                self.ctx.begin_path();
                let _ = self.ctx.arc(
                    bubble.pos.x as f64,
                    bubble.pos.y as f64,
                    bubble.radius() as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                self.ctx.fill();
            }

            if let Some(cursor) = self.cursor {
                self.ctx.set_fill_style_str("#ef4444");
                self.ctx.begin_path();
                let _ = self.ctx.arc(
                    cursor.x as f64,
                    cursor.y as f64,
                    12.0,
                    0.0,
                    std::f64::consts::TAU,
                );
                self.ctx.fill();
            }

            self.set_text("hud-score", &frame.score.to_string());
            self.set_text("hud-time", &frame.time_remaining.to_string());
        }

        fn phase_changed(&mut self, change: &PhaseChange<'_>) {
            use Phase::*;

            if change.to == Playing {
                self.cursor = None;
            }

            let overlays = [
                ("overlay-loading", change.to == LoadingModel),
                ("overlay-camera", change.to == WaitingForCamera),
                ("overlay-ready", change.to == Ready),
                ("overlay-howto", change.to == HowToPlay),
                ("overlay-gameover", change.to == GameOver),
                ("hud", change.to == Playing),
            ];
            for (id, visible) in overlays {
                self.set_class(id, if visible { "" } else { "hidden" });
            }

            if change.to == GameOver {
                self.set_text("final-score", &change.score.to_string());
                match change.message {
                    Some(msg) => {
                        self.set_text("error-message", msg);
                        self.set_class("error-message", "");
                    }
                    None => self.set_class("error-message", "hidden"),
                }
                if let Some(btn) = self.document.get_element_by_id("again-btn") {
                    if change.can_play_again {
                        let _ = btn.remove_attribute("disabled");
                    } else {
                        let _ = btn.set_attribute("disabled", "disabled");
                    }
                }
            }

            if change.to == Exited {
                self.clear_canvas();
            }
        }
    }

    /// Platform-side game instance
    struct Game {
        engine: Engine<DomPresenter>,
        video: HtmlVideoElement,
        stream: Option<MediaStream>,
        /// Interval handles for the motion/spawn/timer tickers
        intervals: Vec<i32>,
        /// One estimate in flight at a time
        estimate_pending: bool,
    }

    impl Game {
        /// Stop every camera track. Mandatory on any terminal exit.
        fn release_camera(&mut self) {
            if let Some(stream) = self.stream.take() {
                for track in stream.get_tracks().iter() {
                    if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
                        track.stop();
                    }
                }
                log::info!("camera released");
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Bubble Burst starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("game-canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");
        let video: HtmlVideoElement = document
            .get_element_by_id("camera-feed")
            .expect("no video element")
            .dyn_into()
            .expect("not a video element");

        let display = Vec2::new(
            window.inner_width().unwrap().as_f64().unwrap() as f32,
            window.inner_height().unwrap().as_f64().unwrap() as f32,
        );
        canvas.set_width(display.x as u32);
        canvas.set_height(display.y as u32);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .expect("canvas context failed")
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        let tuning = Tuning::load();
        let image = Vec2::new(tuning.capture_size.0, tuning.capture_size.1);
        let seed = js_sys::Date::now() as u64;
        let presenter = DomPresenter::new(ctx, document.clone(), display);
        let engine = Engine::new(tuning, image, display, seed, presenter);

        let game = Rc::new(RefCell::new(Game {
            engine,
            video,
            stream: None,
            intervals: Vec::new(),
            estimate_pending: false,
        }));

        log::info!("engine initialized with seed {}", seed);

        setup_buttons(&document, &game);

        // Load the pose model, then acquire the camera
        {
            let game = game.clone();
            spawn_local(async move {
                match JsFuture::from(init_hand_model()).await {
                    Ok(_) => {
                        game.borrow_mut().engine.handle(SessionEvent::ModelLoaded);
                        acquire_camera(&game);
                    }
                    Err(err) => {
                        log::error!("model load failed: {:?}", err);
                        game.borrow_mut()
                            .engine
                            .handle(SessionEvent::ModelFailed(TrackerError::ModelLoadFailed));
                    }
                }
            });
        }

        request_animation_frame(game.clone());

        log::info!("Bubble Burst running!");
    }

    fn setup_buttons(document: &Document, game: &Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            on_click(document, "start-btn", move || {
                game.borrow_mut().engine.handle(SessionEvent::StartGame);
            });
        }
        {
            let game = game.clone();
            on_click(document, "go-btn", move || {
                {
                    game.borrow_mut().engine.handle(SessionEvent::BeginRound);
                }
                sync_round_tasks(&game);
            });
        }
        {
            let game = game.clone();
            on_click(document, "again-btn", move || {
                {
                    game.borrow_mut().engine.handle(SessionEvent::PlayAgain);
                }
                // A lost camera means Play Again re-enters acquisition
                if game.borrow().engine.phase() == Phase::WaitingForCamera {
                    acquire_camera(&game);
                }
            });
        }
        {
            let game = game.clone();
            on_click(document, "exit-btn", move || {
                {
                    let mut g = game.borrow_mut();
                    g.engine.handle(SessionEvent::Exit);
                    g.release_camera();
                }
                sync_round_tasks(&game);
            });
        }
    }

    fn on_click(document: &Document, id: &str, handler: impl Fn() + 'static) {
        if let Some(btn) = document.get_element_by_id(id) {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                handler();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn acquire_camera(game: &Rc<RefCell<Game>>) {
        let game = game.clone();
        spawn_local(async move {
            let (capture_w, capture_h) = game.borrow().engine.tuning().capture_size;

            let window = web_sys::window().expect("no window");
            let devices = match window.navigator().media_devices() {
                Ok(devices) => devices,
                Err(_) => {
                    camera_failed(&game, TrackerError::Unsupported);
                    return;
                }
            };

            let video_opts = js_sys::Object::new();
            let _ = js_sys::Reflect::set(
                &video_opts,
                &"width".into(),
                &JsValue::from_f64(capture_w as f64),
            );
            let _ = js_sys::Reflect::set(
                &video_opts,
                &"height".into(),
                &JsValue::from_f64(capture_h as f64),
            );
            let constraints = web_sys::MediaStreamConstraints::new();
            constraints.set_video(&video_opts);

            let promise = match devices.get_user_media_with_constraints(&constraints) {
                Ok(promise) => promise,
                Err(_) => {
                    camera_failed(&game, TrackerError::Unsupported);
                    return;
                }
            };

            match JsFuture::from(promise).await {
                Ok(stream) => {
                    let stream: MediaStream = match stream.dyn_into() {
                        Ok(stream) => stream,
                        Err(_) => {
                            camera_failed(&game, TrackerError::Unsupported);
                            return;
                        }
                    };
                    watch_stream_end(&game, &stream);

                    let video = game.borrow().video.clone();
                    video.set_src_object(Some(&stream));
                    game.borrow_mut().stream = Some(stream);

                    if let Ok(playing) = video.play() {
                        let _ = JsFuture::from(playing).await;
                    }

                    log::info!("camera stream started");
                    game.borrow_mut().engine.handle(SessionEvent::CameraReady);
                }
                Err(err) => {
                    log::error!("camera access denied: {:?}", err);
                    camera_failed(&game, TrackerError::PermissionDenied);
                }
            }
        });
    }

    fn camera_failed(game: &Rc<RefCell<Game>>, error: TrackerError) {
        game.borrow_mut()
            .engine
            .handle(SessionEvent::CameraFailed(error));
    }

    /// End the round if the camera track dies mid-session
    fn watch_stream_end(game: &Rc<RefCell<Game>>, stream: &MediaStream) {
        if let Ok(track) = stream
            .get_video_tracks()
            .get(0)
            .dyn_into::<web_sys::MediaStreamTrack>()
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                log::warn!("camera track ended");
                {
                    game.borrow_mut()
                        .engine
                        .handle(SessionEvent::StreamLost(TrackerError::StreamLost));
                }
                sync_round_tasks(&game);
            });
            track.set_onended(Some(closure.as_ref().unchecked_ref()));
            closure.forget();
        }
    }

    /// Start or stop the motion/spawn/timer intervals to match the phase.
    /// The engine's ticket validation is the correctness boundary; this is
    /// just housekeeping so dead intervals don't keep firing.
    fn sync_round_tasks(game: &Rc<RefCell<Game>>) {
        let playing = game.borrow().engine.phase() == Phase::Playing;
        let registered = !game.borrow().intervals.is_empty();

        if playing && !registered {
            start_intervals(game);
        } else if !playing && registered {
            stop_intervals(game);
        }
    }

    fn start_intervals(game: &Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        let tuning = game.borrow().engine.tuning().clone();
        let mut ids = Vec::with_capacity(3);

        // Motion ticker
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                let mut g = game.borrow_mut();
                if let Some(ticket) = g.engine.ticket(Task::Motion) {
                    g.engine.motion_tick(ticket);
                }
            });
            if let Ok(id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                tuning.motion_tick_ms as i32,
            ) {
                ids.push(id);
            }
            closure.forget();
        }

        // Spawn ticker
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                let mut g = game.borrow_mut();
                if let Some(ticket) = g.engine.ticket(Task::Spawn) {
                    g.engine.spawn_tick(ticket);
                }
            });
            if let Ok(id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                tuning.spawn_interval_ms as i32,
            ) {
                ids.push(id);
            }
            closure.forget();
        }

        // Round timer
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                {
                    let mut g = game.borrow_mut();
                    if let Some(ticket) = g.engine.ticket(Task::Timer) {
                        g.engine.timer_tick(ticket);
                    }
                }
                // The tick may have ended the round
                sync_round_tasks(&game);
            });
            if let Ok(id) = window.set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                bubble_burst::consts::TIMER_TICK_MS as i32,
            ) {
                ids.push(id);
            }
            closure.forget();
        }

        game.borrow_mut().intervals = ids;
        log::info!("round tasks registered");
    }

    fn stop_intervals(game: &Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        for id in game.borrow_mut().intervals.drain(..) {
            window.clear_interval_with_handle(id);
        }
        log::info!("round tasks cancelled");
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::once(move |_time: f64| {
            frame_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(game: Rc<RefCell<Game>>) {
        // Exit is terminal: stop rescheduling entirely
        if game.borrow().engine.phase() == Phase::Exited {
            return;
        }
        maybe_request_estimate(&game);
        request_animation_frame(game);
    }

    /// Issue one estimate request if the round is live and none is pending.
    /// The ticket is taken before the await; if the phase changes while the
    /// estimate is in flight, the engine rejects the late result.
    fn maybe_request_estimate(game: &Rc<RefCell<Game>>) {
        let ticket = {
            let mut g = game.borrow_mut();
            if g.estimate_pending {
                return;
            }
            let Some(ticket) = g.engine.ticket(Task::FrameLoop) else {
                return;
            };
            g.estimate_pending = true;
            ticket
        };

        let video = game.borrow().video.clone();
        let game = game.clone();
        spawn_local(async move {
            let result = JsFuture::from(estimate_hand(&video)).await;
            {
                let mut g = game.borrow_mut();
                g.estimate_pending = false;
                match result {
                    Ok(value) => {
                        g.engine.frame_tick(ticket, parse_landmarks(&value));
                        return;
                    }
                    Err(err) => {
                        log::error!("estimate failed: {:?}", err);
                        g.engine
                            .handle(SessionEvent::StreamLost(TrackerError::StreamLost));
                    }
                }
            }
            sync_round_tasks(&game);
        });
    }

    /// Flat `[x, y, z] * 21` from the estimator, or null when no hand
    fn parse_landmarks(value: &JsValue) -> Option<HandKeypoints> {
        if value.is_null() || value.is_undefined() {
            return None;
        }
        let array: js_sys::Float32Array = value.clone().dyn_into().ok()?;
        let data = array.to_vec();
        let points: Vec<Keypoint> = data
            .chunks(3)
            .filter(|c| c.len() >= 2)
            .map(|c| Keypoint::new(c[0], c[1]))
            .collect();
        HandKeypoints::new(points)
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bubble Burst (native) starting...");
    log::info!("The browser build drives the real camera - native runs a headless demo round");

    headless_round();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Run one scripted round against a synthetic keypoint source
#[cfg(not(target_arch = "wasm32"))]
fn headless_round() {
    use bubble_burst::presentation::{FrameUpdate, PhaseChange, PresentationSurface};
    use bubble_burst::session::Task;
    use bubble_burst::tracker::{
        HandKeypoints, Keypoint, KeypointSource, TrackerError, KEYPOINT_COUNT,
    };
    use bubble_burst::{Engine, Phase, SessionEvent, Tuning};
    use glam::Vec2;

    struct LogPresenter;
    impl PresentationSurface for LogPresenter {
        fn present(&mut self, _frame: &FrameUpdate<'_>) {}
        fn phase_changed(&mut self, change: &PhaseChange<'_>) {
            log::info!("phase -> {:?} (score {})", change.to, change.score);
        }
    }

    /// Sweeps the hand across the capture frame, with detection misses
    struct SweepSource {
        tick: u32,
    }
    impl KeypointSource for SweepSource {
        fn initialize(&mut self) -> Result<(), TrackerError> {
            Ok(())
        }
        fn open_camera(&mut self) -> Result<(), TrackerError> {
            Ok(())
        }
        fn estimate(&mut self) -> Result<Option<HandKeypoints>, TrackerError> {
            self.tick += 1;
            if self.tick % 5 == 0 {
                return Ok(None);
            }
            let x = (self.tick % 64) as f32 * 10.0;
            let y = (self.tick % 48) as f32 * 10.0;
            Ok(HandKeypoints::new(vec![Keypoint::new(x, y); KEYPOINT_COUNT]))
        }
    }

    let tuning = Tuning::default();
    let image = Vec2::new(tuning.capture_size.0, tuning.capture_size.1);
    let display = Vec2::new(1280.0, 720.0);
    let mut engine = Engine::new(tuning.clone(), image, display, 42, LogPresenter);
    let mut source = SweepSource { tick: 0 };

    engine.handle(match source.initialize() {
        Ok(()) => SessionEvent::ModelLoaded,
        Err(err) => SessionEvent::ModelFailed(err),
    });
    engine.handle(match source.open_camera() {
        Ok(()) => SessionEvent::CameraReady,
        Err(err) => SessionEvent::CameraFailed(err),
    });
    engine.handle(SessionEvent::StartGame);
    engine.handle(SessionEvent::BeginRound);

    // One ms-resolution pass over the round's schedule
    let mut clock_ms: u32 = 0;
    let mut last_spawn: u32 = 0;
    let mut last_estimate: u32 = 0;
    let mut last_timer: u32 = 0;
    while engine.phase() == Phase::Playing && clock_ms < 120_000 {
        clock_ms += tuning.motion_tick_ms;
        if let Some(ticket) = engine.ticket(Task::Motion) {
            engine.motion_tick(ticket);
        }
        if clock_ms - last_spawn >= tuning.spawn_interval_ms {
            last_spawn = clock_ms;
            if let Some(ticket) = engine.ticket(Task::Spawn) {
                engine.spawn_tick(ticket);
            }
        }
        if clock_ms - last_estimate >= 100 {
            last_estimate = clock_ms;
            engine.drive_frame(&mut source);
        }
        if clock_ms - last_timer >= 1000 {
            last_timer = clock_ms;
            if let Some(ticket) = engine.ticket(Task::Timer) {
                engine.timer_tick(ticket);
            }
        }
    }

    log::info!("demo round finished with score {}", engine.round().score);
}
