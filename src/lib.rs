pub mod clock;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod render;
pub mod sink;
pub mod sweep;
pub mod trail;

use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

pub use clock::{ClockState, FrameClock, FrameHandle, FrameQueue, RepaintScheduler};
pub use config::{Color, RadarConfig};
pub use detection::{ContactStatus, Detection, DetectionSimulator, SeedContact, DEMO_CONTACTS};
pub use engine::RadarEngine;
pub use error::{RadarError, Result};
pub use render::{Canvas, PanelStatus, RadarView, Viewport};
pub use sink::{Dashboard, DetectionSink, NullSink};

// ============================================================================
// PUBLIC API
// ============================================================================

pub struct Radar {
    config: RadarConfig,
}

impl Radar {
    pub fn new(config: RadarConfig) -> Self {
        Self { config }
    }

    /// Open the scope window and run until it is closed.
    pub fn show(&self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(
                self.config.window_width as f64,
                self.config.window_height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)?;
        let window = Arc::new(window);
        let window_clone = window.clone();

        // The buffer keeps the logical layout; pixels scales it onto the
        // physical surface.
        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(
            self.config.window_width as u32,
            self.config.window_height as u32,
            surface_texture,
        )?;
        let mut surface_ready = size.width > 0 && size.height > 0;

        let font = render::discover_font(&self.config);
        let mut app = App::new(self.config.clone(), font, Instant::now());
        app.request_start(Instant::now());

        let frame_duration = self.config.frame_interval();
        let mut last_frame = Instant::now();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        surface_ready = new_size.width > 0 && new_size.height > 0;
                        app.invalidate();
                        if surface_ready {
                            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height)
                            {
                                log::warn!("surface resize failed: {}", e);
                                surface_ready = false;
                            }
                        }
                    }
                    WindowEvent::Occluded(occluded) => {
                        app.set_occluded(occluded, Instant::now());
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if app.handle_key(&event, Instant::now()) == KeyOutcome::Exit {
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        app.frame(Instant::now());
                        if surface_ready {
                            let width = app.config.window_width;
                            let height = app.config.window_height;
                            app.draw(pixels.frame_mut(), width, height, Instant::now());
                            if let Err(e) = pixels.render() {
                                log::error!("render failed: {}", e);
                                window_target.exit();
                            }
                            app.mark_drawn();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    let now = Instant::now();
                    app.poll_startup(now);
                    let due = last_frame.elapsed() >= frame_duration;
                    if due && app.wants_redraw() {
                        window_clone.request_redraw();
                        last_frame = now;
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Handled,
    Ignored,
    Exit,
}

/// Everything the window loop owns besides the window itself.
struct App {
    config: RadarConfig,
    engine: RadarEngine,
    dashboard: Dashboard,
    queue: FrameQueue,
    origin: Instant,
    /// Engine time at `origin`.
    clock_offset: Duration,
    /// When the scope starts after the warm-up overlay.
    pending_start: Option<Instant>,
    /// Stopped because the window was hidden; restart when shown.
    resume_on_visible: bool,
    /// Something visible changed since the last drawn frame.
    needs_redraw: bool,
    font: Option<Font<'static>>,
}

impl App {
    fn new(config: RadarConfig, font: Option<Font<'static>>, origin: Instant) -> Self {
        let mut engine = RadarEngine::new(config.clone());
        let mut dashboard = Dashboard::new(&config);
        let mut clock_offset = Duration::ZERO;
        if config.demo_contacts {
            // Engine time must already cover the oldest backdated contact.
            clock_offset = DEMO_CONTACTS
                .iter()
                .map(|contact| contact.age)
                .max()
                .unwrap_or_default();
            engine.seed_contacts(&DEMO_CONTACTS, clock_offset, &mut dashboard);
            log::info!("seeded {} demo contacts", DEMO_CONTACTS.len());
        }
        Self {
            config,
            engine,
            dashboard,
            queue: FrameQueue::new(),
            origin,
            clock_offset,
            pending_start: None,
            resume_on_visible: false,
            needs_redraw: true,
            font,
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.clock_offset + now.saturating_duration_since(self.origin)
    }

    fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    fn wants_frame(&self) -> bool {
        self.queue.outstanding().is_some()
    }

    /// Running scopes repaint every frame and the warm-up overlay animates.
    /// Otherwise the static frame is repainted only after a change.
    fn wants_redraw(&self) -> bool {
        self.wants_frame() || self.pending_start.is_some() || self.needs_redraw
    }

    fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    fn mark_drawn(&mut self) {
        self.needs_redraw = false;
    }

    fn status(&self) -> PanelStatus {
        if self.pending_start.is_some() {
            PanelStatus::Initializing
        } else if self.is_running() {
            PanelStatus::Active
        } else {
            PanelStatus::Standby
        }
    }

    /// Begin the warm-up; the engine starts once it has elapsed.
    fn request_start(&mut self, now: Instant) {
        if self.is_running() || self.pending_start.is_some() {
            return;
        }
        log::info!("initializing");
        self.pending_start = Some(now + self.config.startup_delay());
        self.poll_startup(now);
    }

    fn poll_startup(&mut self, now: Instant) {
        if let Some(at) = self.pending_start {
            if now >= at {
                self.pending_start = None;
                self.engine.start(&mut self.queue);
            }
        }
    }

    fn toggle(&mut self, now: Instant) {
        if self.pending_start.take().is_some() {
            log::info!("start aborted");
        } else if self.is_running() {
            self.engine.stop(&mut self.queue);
        } else {
            self.request_start(now);
        }
        self.invalidate();
    }

    fn set_occluded(&mut self, occluded: bool, now: Instant) {
        if occluded {
            if self.is_running() || self.pending_start.is_some() {
                log::debug!("window hidden, pausing");
                self.pending_start = None;
                self.engine.stop(&mut self.queue);
                self.resume_on_visible = true;
            }
        } else {
            if self.resume_on_visible {
                log::debug!("window visible, resuming");
                self.resume_on_visible = false;
                self.engine.start(&mut self.queue);
                self.poll_startup(now);
            }
            self.invalidate();
        }
    }

    fn handle_key(&mut self, event: &KeyEvent, now: Instant) -> KeyOutcome {
        if event.state != ElementState::Pressed {
            return KeyOutcome::Ignored;
        }
        match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) => KeyOutcome::Exit,
            Key::Named(NamedKey::Space) if !event.repeat => {
                self.toggle(now);
                KeyOutcome::Handled
            }
            Key::Named(NamedKey::ArrowUp) | Key::Character("+") | Key::Character("=") => {
                self.adjust_range(1);
                KeyOutcome::Handled
            }
            Key::Named(NamedKey::ArrowDown) | Key::Character("-") => {
                self.adjust_range(-1);
                KeyOutcome::Handled
            }
            Key::Character("c") | Key::Character("C") if !event.repeat => {
                self.clear();
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }

    fn adjust_range(&mut self, steps: i32) {
        self.engine.adjust_range(steps);
        self.invalidate();
    }

    fn clear(&mut self) {
        self.engine.clear(&mut self.dashboard);
        self.invalidate();
    }

    /// Serve the outstanding frame request, if there is one.
    fn frame(&mut self, now: Instant) -> bool {
        let Some(handle) = self.queue.serve() else {
            return false;
        };
        let elapsed = self.elapsed(now);
        self.engine
            .on_frame(handle, elapsed, &mut self.queue, &mut self.dashboard)
    }

    fn draw(&self, frame: &mut [u8], width: usize, height: usize, now: Instant) {
        let mut canvas = Canvas::new(frame, width, height);
        if canvas.is_empty() {
            return;
        }
        let radar_width = self.config.radar_width.min(canvas.width());
        let radar = Viewport::new(0, 0, radar_width, canvas.height());
        let panel = Viewport::new(
            radar_width as i32,
            0,
            canvas.width() - radar_width,
            canvas.height(),
        );
        let elapsed = self.elapsed(now);
        let font = self.font.as_ref();

        let view = self.engine.view(elapsed);
        render::render_radar(&mut canvas, radar, &view, &self.config, font);
        if let Some(at) = self.pending_start {
            let delay = self.config.startup_delay().as_secs_f64();
            let remaining = at.saturating_duration_since(now).as_secs_f64();
            let progress = if delay > 0.0 {
                1.0 - remaining / delay
            } else {
                1.0
            };
            render::render_startup_overlay(&mut canvas, radar, progress, &self.config, font);
        }
        render::render_dashboard(
            &mut canvas,
            panel,
            &self.dashboard,
            self.status(),
            self.engine.max_range(),
            &self.config,
            font,
        );
    }
}
