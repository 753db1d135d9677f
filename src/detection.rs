use rand::Rng;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::time::Duration;

use crate::config::RadarConfig;
use crate::sink::DetectionSink;

/// Proximity class shown in the detection log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactStatus {
    Normal,
    Close,
    Alert,
}

impl ContactStatus {
    pub fn classify(distance: f64, close_distance: f64, alert_distance: f64) -> Self {
        if distance < alert_distance {
            ContactStatus::Alert
        } else if distance < close_distance {
            ContactStatus::Close
        } else {
            ContactStatus::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContactStatus::Normal => "Normal",
            ContactStatus::Close => "Close",
            ContactStatus::Alert => "Alert",
        }
    }
}

/// Expanding ring drawn around a fresh contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ripple {
    pub radius: f64,
    pub speed: f64,
    pub opacity: f64,
    pub decay: f64,
}

impl Ripple {
    fn age(&mut self) {
        self.radius += self.speed;
        self.opacity -= self.decay;
    }
}

/// A simulated contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub id: u64,
    pub angle: f64,
    pub distance: f64,
    pub intensity: f64,
    pub captured_at: Duration,
    pub ripples: Vec<Ripple>,
}

impl Detection {
    pub fn new(id: u64, angle: f64, distance: f64, intensity: f64, captured_at: Duration) -> Self {
        Self {
            id,
            angle,
            distance,
            intensity,
            captured_at,
            ripples: Vec::new(),
        }
    }

    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.captured_at)
    }

    /// Proximity class of the rounded distance, as shown in the log.
    pub fn status(&self, close_distance: f64, alert_distance: f64) -> ContactStatus {
        ContactStatus::classify(self.distance.round(), close_distance, alert_distance)
    }

    /// Linear fade over the contact's lifetime.
    pub fn alpha(&self, now: Duration, lifetime: Duration) -> f64 {
        (1.0 - self.age(now).as_secs_f64() / lifetime.as_secs_f64()).max(0.0)
    }
}

/// A contact to inject directly, bypassing the random draw.
#[derive(Debug, Clone, Copy)]
pub struct SeedContact {
    pub angle: f64,
    pub distance: f64,
    pub intensity: f64,
    pub age: Duration,
}

/// The four contacts shown by demo mode.
pub const DEMO_CONTACTS: [SeedContact; 4] = [
    SeedContact {
        angle: 45.0,
        distance: 67.0,
        intensity: 0.8,
        age: Duration::from_millis(4000),
    },
    SeedContact {
        angle: 78.0,
        distance: 123.0,
        intensity: 0.6,
        age: Duration::from_millis(3000),
    },
    SeedContact {
        angle: 112.0,
        distance: 89.0,
        intensity: 0.9,
        age: Duration::from_millis(2000),
    },
    SeedContact {
        angle: 156.0,
        distance: 45.0,
        intensity: 0.7,
        age: Duration::from_millis(1000),
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ScheduledRipple {
    fire_at: Duration,
    seq: u64,
    detection: u64,
}

/// Inputs the simulator reads from the rest of the engine each tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now: Duration,
    pub sweep_angle: f64,
    pub max_range: f64,
}

/// Spawns, ages and expires contacts. Ripple insertions are queued by fire
/// time and applied at the start of the tick that reaches them.
#[derive(Debug, Clone)]
pub struct DetectionSimulator {
    detections: VecDeque<Detection>,
    pending: BinaryHeap<Reverse<ScheduledRipple>>,
    next_id: u64,
    next_seq: u64,
    probability: f64,
    lifetime: Duration,
    capacity: usize,
    angle_jitter: f64,
    angle_bounds: (f64, f64),
    min_distance: f64,
    ripple_template: Ripple,
    ripple_count: usize,
    ripple_stagger: Duration,
}

impl DetectionSimulator {
    pub fn new(config: &RadarConfig) -> Self {
        Self {
            detections: VecDeque::new(),
            pending: BinaryHeap::new(),
            next_id: 1,
            next_seq: 0,
            probability: config.detection_probability.clamp(0.0, 1.0),
            lifetime: config.detection_lifetime(),
            capacity: config.max_detections,
            angle_jitter: config.angle_jitter.abs(),
            angle_bounds: (config.min_angle, config.max_angle),
            min_distance: config.min_distance,
            ripple_template: Ripple {
                radius: 0.0,
                speed: config.ripple_speed,
                opacity: config.ripple_opacity,
                decay: config.ripple_decay,
            },
            ripple_count: config.ripple_count,
            ripple_stagger: config.ripple_stagger(),
        }
    }

    pub fn detections(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn pending_ripples(&self) -> usize {
        self.pending.len()
    }

    /// One simulation step. Returns the id of the contact spawned this
    /// tick, if any.
    pub fn tick<R, S>(&mut self, input: TickInput, rng: &mut R, sink: &mut S) -> Option<u64>
    where
        R: Rng,
        S: DetectionSink + ?Sized,
    {
        self.fire_due_ripples(input.now);

        let spawned = if rng.random_bool(self.probability) {
            let detection = self.roll_contact(input, rng);
            let id = detection.id;
            sink.on_detection(&detection);
            self.insert(detection, input.now);
            Some(id)
        } else {
            None
        };

        self.expire(input.now);
        self.enforce_capacity();

        for detection in self.detections.iter_mut() {
            detection.ripples.iter_mut().for_each(Ripple::age);
            detection.ripples.retain(|ripple| ripple.opacity > 0.0);
        }

        spawned
    }

    /// Insert pre-aged contacts, notifying the sink for each.
    pub fn seed<S>(&mut self, contacts: &[SeedContact], now: Duration, sink: &mut S)
    where
        S: DetectionSink + ?Sized,
    {
        for contact in contacts {
            let id = self.take_id();
            let detection = Detection::new(
                id,
                contact.angle.clamp(self.angle_bounds.0, self.angle_bounds.1),
                contact.distance,
                contact.intensity,
                now.saturating_sub(contact.age),
            );
            sink.on_detection(&detection);
            self.insert(detection, now);
        }
        self.enforce_capacity();
    }

    pub fn clear(&mut self) {
        self.detections.clear();
        self.pending.clear();
    }

    fn roll_contact<R: Rng>(&mut self, input: TickInput, rng: &mut R) -> Detection {
        let distance = rng.random_range(self.min_distance..self.min_distance + input.max_range);
        let jitter = if self.angle_jitter > 0.0 {
            rng.random_range(-self.angle_jitter..self.angle_jitter)
        } else {
            0.0
        };
        let angle = (input.sweep_angle + jitter).clamp(self.angle_bounds.0, self.angle_bounds.1);
        let intensity = rng.random_range(0.5..1.0);
        Detection::new(self.take_id(), angle, distance, intensity, input.now)
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, detection: Detection, now: Duration) {
        for i in 0..self.ripple_count {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.pending.push(Reverse(ScheduledRipple {
                fire_at: now + self.ripple_stagger * i as u32,
                seq,
                detection: detection.id,
            }));
        }
        self.detections.push_back(detection);
    }

    fn fire_due_ripples(&mut self, now: Duration) {
        while let Some(Reverse(event)) = self.pending.peek().copied() {
            if event.fire_at > now {
                break;
            }
            self.pending.pop();
            // Ids are handed out in insertion order, so the deque is sorted.
            match self
                .detections
                .binary_search_by_key(&event.detection, |d| d.id)
            {
                Ok(index) => self.detections[index].ripples.push(self.ripple_template),
                Err(_) => log::trace!("ripple for departed contact #{}", event.detection),
            }
        }
    }

    fn expire(&mut self, now: Duration) {
        let lifetime = self.lifetime;
        let before = self.detections.len();
        self.detections.retain(|d| d.age(now) < lifetime);
        let expired = before - self.detections.len();
        if expired > 0 {
            log::trace!("{} contact(s) expired", expired);
        }
    }

    fn enforce_capacity(&mut self) {
        while self.detections.len() > self.capacity {
            if let Some(evicted) = self.detections.pop_front() {
                log::trace!("evicted contact #{}", evicted.id);
            }
        }
    }
}
