use std::collections::VecDeque;

use crate::config::RadarConfig;
use crate::detection::{ContactStatus, Detection};

pub const EMPTY_LOG_PLACEHOLDER: &str = "No detections recorded";

/// Receiver for everything the engine reports outward. The engine never
/// reads anything back from a sink.
pub trait DetectionSink {
    fn on_detection(&mut self, detection: &Detection);
    fn on_clear(&mut self);
    fn on_tick(&mut self, live_count: usize, angle: f64, distance: f64);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DetectionSink for NullSink {
    fn on_detection(&mut self, _detection: &Detection) {}
    fn on_clear(&mut self) {}
    fn on_tick(&mut self, _live_count: usize, _angle: f64, _distance: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub time: String,
    pub angle: i64,
    pub distance: i64,
    pub status: ContactStatus,
}

/// Most recent detections, newest first, bounded.
#[derive(Debug, Clone)]
pub struct DetectionLog {
    rows: VecDeque<LogRow>,
    capacity: usize,
}

impl DetectionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, row: LogRow) {
        self.rows.push_front(row);
        self.rows.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> impl Iterator<Item = &LogRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A numeric display that eases toward its latest target each frame.
#[derive(Debug, Clone)]
pub struct Readout {
    value: f64,
    target: f64,
    lerp_factor: f64,
}

impl Readout {
    pub fn new(lerp_factor: f64) -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            lerp_factor,
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    pub fn update(&mut self) {
        self.value = lerp(self.value, self.target, self.lerp_factor);
    }

    /// Rounded value as shown on screen.
    pub fn shown(&self) -> i64 {
        self.value.round() as i64
    }
}

fn lerp(current: f64, target: f64, factor: f64) -> f64 {
    current + (target - current) * factor
}

/// Readouts and detection table shown next to the scope.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub distance: Readout,
    pub angle: Readout,
    pub object_count: usize,
    pub log: DetectionLog,
    close_distance: f64,
    alert_distance: f64,
}

impl Dashboard {
    pub fn new(config: &RadarConfig) -> Self {
        Self {
            distance: Readout::new(config.readout_lerp_factor),
            angle: Readout::new(config.readout_lerp_factor),
            object_count: 0,
            log: DetectionLog::new(config.log_rows),
            close_distance: config.close_distance,
            alert_distance: config.alert_distance,
        }
    }

    fn row_for(&self, detection: &Detection, time: String) -> LogRow {
        LogRow {
            time,
            angle: detection.angle.round() as i64,
            distance: detection.distance.round() as i64,
            status: detection.status(self.close_distance, self.alert_distance),
        }
    }
}

impl DetectionSink for Dashboard {
    fn on_detection(&mut self, detection: &Detection) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        let row = self.row_for(detection, time);
        log::debug!(
            "contact #{} at {}° {} cm ({})",
            detection.id,
            row.angle,
            row.distance,
            row.status.label()
        );
        self.log.push(row);
    }

    fn on_clear(&mut self) {
        self.log.clear();
        self.object_count = 0;
    }

    fn on_tick(&mut self, live_count: usize, angle: f64, distance: f64) {
        self.object_count = live_count;
        self.angle.set_target(angle);
        self.distance.set_target(distance);
        self.angle.update();
        self.distance.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use test_log::test;

    fn contact(id: u64, distance: f64) -> Detection {
        Detection::new(id, 90.0, distance, 0.7, Duration::ZERO)
    }

    fn row(n: i64) -> LogRow {
        LogRow {
            time: "00:00:00".to_string(),
            angle: n,
            distance: n,
            status: ContactStatus::Normal,
        }
    }

    #[test]
    fn test_log_keeps_newest_first_and_caps() {
        let mut log = DetectionLog::new(10);
        for n in 0..15 {
            log.push(row(n));
        }
        assert_eq!(log.len(), 10);
        let angles: Vec<i64> = log.rows().map(|r| r.angle).collect();
        assert_eq!(angles, (5..15).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_dashboard_rows_carry_status() {
        let config = RadarConfig::builder().max_range(150.0).build();
        let mut dashboard = Dashboard::new(&config);
        dashboard.on_detection(&contact(1, 80.0));
        dashboard.on_detection(&contact(2, 40.0));
        dashboard.on_detection(&contact(3, 25.0));

        let statuses: Vec<_> = dashboard.log.rows().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ContactStatus::Alert,
                ContactStatus::Close,
                ContactStatus::Normal
            ]
        );
        let first = dashboard.log.rows().next().unwrap();
        assert_eq!(first.distance, 25);
        assert_eq!(first.angle, 90);
        assert_eq!(first.time.len(), 8);
    }

    #[test]
    fn test_dashboard_clear() {
        let mut dashboard = Dashboard::new(&RadarConfig::default());
        dashboard.on_detection(&contact(1, 80.0));
        dashboard.on_tick(1, 45.0, 60.0);
        dashboard.on_clear();
        assert!(dashboard.log.is_empty());
        assert_eq!(dashboard.object_count, 0);
    }

    #[test]
    fn test_readout_eases_toward_target() {
        let mut readout = Readout::new(0.1);
        readout.set_target(100.0);
        readout.update();
        assert_eq!(readout.shown(), 10);
        for _ in 0..200 {
            readout.update();
        }
        assert_eq!(readout.shown(), 100);
    }
}
