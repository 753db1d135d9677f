use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use crate::clock::{ClockState, FrameClock, FrameHandle, RepaintScheduler};
use crate::config::RadarConfig;
use crate::detection::{DetectionSimulator, SeedContact, TickInput};
use crate::render::RadarView;
use crate::sink::DetectionSink;
use crate::sweep::SweepState;
use crate::trail::TrailBuffer;

/// Owns every piece of mutable radar state. Time is always passed in.
#[derive(Debug, Clone)]
pub struct RadarEngine {
    config: RadarConfig,
    clock: FrameClock,
    sweep: SweepState,
    trail: TrailBuffer,
    simulator: DetectionSimulator,
    max_range: f64,
    rng: ChaCha8Rng,
}

impl RadarEngine {
    pub fn new(config: RadarConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("seed {seed}");
        Self {
            clock: FrameClock::new(),
            sweep: SweepState::new(config.min_angle, config.max_angle),
            trail: TrailBuffer::new(config.trail_window()),
            simulator: DetectionSimulator::new(&config),
            max_range: config.clamp_range(config.max_range),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        }
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.clock.pending().is_some()
    }

    pub fn sweep(&self) -> &SweepState {
        &self.sweep
    }

    pub fn trail(&self) -> &TrailBuffer {
        &self.trail
    }

    pub fn simulator(&self) -> &DetectionSimulator {
        &self.simulator
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    /// Apply the sensitivity control. Visible from the next tick on.
    pub fn set_max_range(&mut self, range: f64) -> f64 {
        let clamped = self.config.clamp_range(range);
        if clamped != self.max_range {
            log::info!("max range {} cm", clamped);
        }
        self.max_range = clamped;
        clamped
    }

    /// Move the sensitivity by whole steps (negative narrows).
    pub fn adjust_range(&mut self, steps: i32) -> f64 {
        self.set_max_range(self.max_range + self.config.range_step * steps as f64)
    }

    pub fn start<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if !self.clock.start(scheduler) {
            return false;
        }
        self.trail.clear();
        log::info!("radar started at {:.1}°", self.sweep.angle());
        true
    }

    /// Stop ticking and leave a static frame with no trail.
    pub fn stop<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        let was_running = self.clock.is_running();
        self.clock.stop(scheduler);
        self.trail.clear();
        if was_running {
            log::info!("radar stopped");
        }
    }

    pub fn toggle<S: RepaintScheduler + ?Sized>(&mut self, scheduler: &mut S) -> ClockState {
        if self.is_running() {
            self.stop(scheduler);
        } else {
            self.start(scheduler);
        }
        self.state()
    }

    /// Handle a served repaint. Ticks and requests the following frame when
    /// the repaint was ours; returns whether a tick ran.
    pub fn on_frame<S, K>(
        &mut self,
        handle: FrameHandle,
        now: Duration,
        scheduler: &mut S,
        sink: &mut K,
    ) -> bool
    where
        S: RepaintScheduler + ?Sized,
        K: DetectionSink + ?Sized,
    {
        if !self.clock.fire(handle) {
            return false;
        }
        self.tick(now, sink);
        self.clock.schedule_next(scheduler);
        true
    }

    fn tick<K: DetectionSink + ?Sized>(&mut self, now: Duration, sink: &mut K) {
        self.sweep.advance(self.config.sweep_step);

        self.trail.record(self.sweep.angle(), now);
        self.trail.prune(now);

        let input = TickInput {
            now,
            sweep_angle: self.sweep.angle(),
            max_range: self.max_range,
        };
        self.simulator.tick(input, &mut self.rng, sink);

        let distance = self.simulated_distance(now);
        sink.on_tick(self.simulator.len(), self.sweep.angle(), distance);
    }

    /// The wandering "current distance" shown in the readouts.
    fn simulated_distance(&mut self, now: Duration) -> f64 {
        let t = now.as_millis() as f64;
        let base = 50.0 + (t * 0.003).sin() * 30.0 + self.rng.random_range(0.0..40.0);
        base.clamp(self.config.min_distance, self.max_range)
    }

    /// Drop every contact, pending ripple and trail point.
    pub fn clear<K: DetectionSink + ?Sized>(&mut self, sink: &mut K) {
        self.simulator.clear();
        self.trail.clear();
        sink.on_clear();
        log::info!("detections cleared");
    }

    pub fn seed_contacts<K: DetectionSink + ?Sized>(
        &mut self,
        contacts: &[SeedContact],
        now: Duration,
        sink: &mut K,
    ) {
        self.simulator.seed(contacts, now, sink);
    }

    /// Snapshot for the renderer.
    pub fn view(&self, now: Duration) -> RadarView<'_> {
        RadarView {
            sweep_angle: self.sweep.angle(),
            active: self.is_running(),
            max_range: self.max_range,
            lifetime: self.simulator.lifetime(),
            beam_width: self.config.beam_width,
            trail: self.trail.points(now).collect(),
            detections: self.simulator.detections().collect(),
            now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrameQueue;
    use crate::detection::{Detection, DEMO_CONTACTS};
    use crate::sink::NullSink;
    use test_log::test;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn engine() -> RadarEngine {
        RadarEngine::new(RadarConfig::builder().seed(42).build())
    }

    #[derive(Default)]
    struct Recorder {
        spawned: usize,
        cleared: usize,
        ticks: Vec<(usize, f64, f64)>,
    }

    impl DetectionSink for Recorder {
        fn on_detection(&mut self, _detection: &Detection) {
            self.spawned += 1;
        }
        fn on_clear(&mut self) {
            self.cleared += 1;
        }
        fn on_tick(&mut self, live_count: usize, angle: f64, distance: f64) {
            self.ticks.push((live_count, angle, distance));
        }
    }

    /// Serve frames at ~60 fps until `frames` ticks have run.
    fn run(engine: &mut RadarEngine, queue: &mut FrameQueue, sink: &mut Recorder, frames: u64) {
        for frame in 0..frames {
            let handle = queue.serve().expect("running engine keeps a frame requested");
            assert!(engine.on_frame(handle, ms(frame * 16), queue, sink));
        }
    }

    #[test]
    fn test_ticks_drive_everything() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        assert!(engine.start(&mut queue));
        run(&mut engine, &mut queue, &mut sink, 600);

        assert_eq!(sink.ticks.len(), 600);
        assert!(sink.spawned > 0);
        assert!(engine.simulator().len() <= 25);
        assert!(!engine.trail().is_empty());
        for (count, angle, distance) in &sink.ticks {
            assert!(*count <= 25);
            assert!((15.0..=165.0).contains(angle));
            assert!((20.0..=150.0).contains(distance));
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = engine();
        let mut b = engine();
        let (mut qa, mut qb) = (FrameQueue::new(), FrameQueue::new());
        let (mut sa, mut sb) = (Recorder::default(), Recorder::default());
        a.start(&mut qa);
        b.start(&mut qb);
        run(&mut a, &mut qa, &mut sa, 300);
        run(&mut b, &mut qb, &mut sb, 300);
        assert_eq!(sa.ticks, sb.ticks);
        let da: Vec<_> = a.simulator().detections().cloned().collect();
        let db: Vec<_> = b.simulator().detections().cloned().collect();
        assert_eq!(da, db);
    }

    #[test]
    fn test_stop_twice_matches_stop_once() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        run(&mut engine, &mut queue, &mut sink, 10);

        engine.stop(&mut queue);
        let once = (engine.state(), engine.trail().len(), engine.has_pending_frame());
        engine.stop(&mut queue);
        let twice = (engine.state(), engine.trail().len(), engine.has_pending_frame());

        assert_eq!(once, (ClockState::Idle, 0, false));
        assert_eq!(once, twice);
        assert!(queue.outstanding().is_none());
    }

    #[test]
    fn test_no_tick_after_stop() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        let handle = engine.clock.pending().unwrap();
        engine.stop(&mut queue);

        assert!(!engine.on_frame(handle, ms(16), &mut queue, &mut sink));
        assert!(sink.ticks.is_empty());
        assert!(queue.outstanding().is_none());
    }

    #[test]
    fn test_rapid_toggle_single_loop() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        engine.stop(&mut queue);
        engine.start(&mut queue);
        assert!(!engine.start(&mut queue));

        assert_eq!(queue.requested() - queue.cancelled(), 1);
        run(&mut engine, &mut queue, &mut sink, 5);
        assert_eq!(sink.ticks.len(), 5);
        assert_eq!(queue.requested() - queue.cancelled(), 6);
    }

    #[test]
    fn test_toggle_alternates() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        assert_eq!(engine.toggle(&mut queue), ClockState::Running);
        assert!(engine.has_pending_frame());
        assert_eq!(engine.toggle(&mut queue), ClockState::Idle);
        assert!(!engine.has_pending_frame());
        assert!(queue.outstanding().is_none());
    }

    #[test]
    fn test_start_clears_trail() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        run(&mut engine, &mut queue, &mut sink, 10);
        assert!(!engine.trail().is_empty());
        engine.stop(&mut queue);
        engine.start(&mut queue);
        assert!(engine.trail().is_empty());
    }

    #[test]
    fn test_sweep_continues_across_restart() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        run(&mut engine, &mut queue, &mut sink, 10);
        assert_eq!(engine.sweep().angle(), 30.0);
        engine.stop(&mut queue);
        assert_eq!(engine.sweep().angle(), 30.0);
    }

    #[test]
    fn test_range_control() {
        let mut engine = engine();
        assert_eq!(engine.max_range(), 150.0);
        assert_eq!(engine.adjust_range(3), 180.0);
        assert_eq!(engine.set_max_range(10.0), 50.0);
        assert_eq!(engine.set_max_range(900.0), 300.0);
        assert_eq!(engine.adjust_range(-1), 290.0);
    }

    #[test]
    fn test_narrow_range_with_large_min_distance() {
        let mut engine = RadarEngine::new(
            RadarConfig::builder()
                .seed(1)
                .min_distance(60.0)
                .detection_probability(1.0)
                .build(),
        );
        assert_eq!(engine.set_max_range(50.0), 60.0);

        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        run(&mut engine, &mut queue, &mut sink, 20);
        for (_, _, distance) in &sink.ticks {
            assert_eq!(*distance, 60.0);
        }
        assert!(engine
            .simulator()
            .detections()
            .all(|d| d.distance >= 60.0 && d.distance < 120.0));
    }

    #[test]
    fn test_zero_range_floor_never_yields_empty_range() {
        let mut engine = RadarEngine::new(
            RadarConfig::builder()
                .seed(2)
                .range_floor(0.0)
                .min_distance(0.0)
                .detection_probability(1.0)
                .build(),
        );
        assert!(engine.set_max_range(0.0) > 0.0);

        let mut queue = FrameQueue::new();
        let mut sink = Recorder::default();
        engine.start(&mut queue);
        run(&mut engine, &mut queue, &mut sink, 20);
        assert_eq!(sink.spawned, 20);
    }

    #[test]
    fn test_clear_notifies_sink() {
        let mut engine = engine();
        let mut sink = Recorder::default();
        engine.seed_contacts(&DEMO_CONTACTS, ms(5000), &mut sink);
        assert_eq!(sink.spawned, 4);
        assert_eq!(engine.simulator().len(), 4);

        engine.clear(&mut sink);
        assert_eq!(sink.cleared, 1);
        assert!(engine.simulator().is_empty());
        assert_eq!(engine.simulator().pending_ripples(), 0);
    }

    #[test]
    fn test_view_reflects_state() {
        let mut engine = engine();
        let mut queue = FrameQueue::new();
        engine.seed_contacts(&DEMO_CONTACTS, ms(5000), &mut NullSink);
        let idle = engine.view(ms(5000));
        assert!(!idle.active);
        assert!(idle.trail.is_empty());
        assert_eq!(idle.detections.len(), 4);

        engine.start(&mut queue);
        let handle = queue.serve().unwrap();
        engine.on_frame(handle, ms(5016), &mut queue, &mut NullSink);
        let live = engine.view(ms(5016));
        assert!(live.active);
        assert_eq!(live.trail.len(), 1);
        assert_eq!(live.sweep_angle, 16.5);
    }
}
