use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

/// Color representation for scope elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

pub const PHOSPHOR_GREEN: Color = Color::new(0x00, 0xff, 0x9f);
pub const ECHO_CYAN: Color = Color::new(0x00, 0xd1, 0xff);
/// Smallest usable maximum range in cm.
const MIN_RANGE: f64 = 1.0;

pub const SCOPE_BLACK: Color = Color::new(0x0a, 0x0a, 0x0f);

/// Every tunable of the radar display. Build with `RadarConfig::builder()`.
#[derive(Debug, Clone, Builder)]
pub struct RadarConfig {
    #[builder(default = "Ultrasonic Radar".to_string())]
    pub title: String,

    // Window configuration
    #[builder(default = 940)]
    pub window_width: usize,
    #[builder(default = 380)]
    pub window_height: usize,
    /// Width of the scope viewport; the dashboard takes the rest.
    #[builder(default = 640)]
    pub radar_width: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,

    // Sweep configuration
    #[builder(default = 15.0)]
    pub min_angle: f64,
    #[builder(default = 165.0)]
    pub max_angle: f64,
    #[builder(default = 1.5)]
    pub sweep_step: f64,
    #[builder(default = 15.0)]
    pub beam_width: f64,
    #[builder(default = 1000)]
    pub trail_window_ms: u64,

    // Range (sensitivity) configuration
    #[builder(default = 150.0)]
    pub max_range: f64,
    #[builder(default = 50.0)]
    pub range_floor: f64,
    #[builder(default = 300.0)]
    pub range_ceiling: f64,
    #[builder(default = 10.0)]
    pub range_step: f64,

    // Detection configuration
    #[builder(default = 0.08)]
    pub detection_probability: f64,
    #[builder(default = 15_000)]
    pub detection_lifetime_ms: u64,
    #[builder(default = 25)]
    pub max_detections: usize,
    #[builder(default = 4.0)]
    pub angle_jitter: f64,
    #[builder(default = 20.0)]
    pub min_distance: f64,

    // Ripple configuration
    #[builder(default = 3)]
    pub ripple_count: usize,
    #[builder(default = 200)]
    pub ripple_stagger_ms: u64,
    #[builder(default = 2.0)]
    pub ripple_speed: f64,
    #[builder(default = 0.8)]
    pub ripple_opacity: f64,
    #[builder(default = 0.02)]
    pub ripple_decay: f64,

    // Dashboard configuration
    #[builder(default = 10)]
    pub log_rows: usize,
    #[builder(default = 50.0)]
    pub close_distance: f64,
    #[builder(default = 30.0)]
    pub alert_distance: f64,
    #[builder(default = 0.1)]
    pub readout_lerp_factor: f64,
    #[builder(default = 2000)]
    pub startup_delay_ms: u64,
    #[builder(default = false)]
    pub demo_contacts: bool,

    // Colors
    #[builder(default = PHOSPHOR_GREEN)]
    pub primary_color: Color,
    #[builder(default = ECHO_CYAN)]
    pub secondary_color: Color,
    #[builder(default = SCOPE_BLACK)]
    pub background_color: Color,

    // Text
    pub font_path: Option<PathBuf>,
    #[builder(default = 11.0)]
    pub range_label_size: f32,
    #[builder(default = 10.0)]
    pub angle_label_size: f32,
    #[builder(default = 14.0)]
    pub dashboard_font_size: f32,

    /// Seed for the contact generator; random when absent.
    pub seed: Option<u64>,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RadarConfig {
    pub fn trail_window(&self) -> Duration {
        Duration::from_millis(self.trail_window_ms)
    }

    pub fn detection_lifetime(&self) -> Duration {
        Duration::from_millis(self.detection_lifetime_ms)
    }

    pub fn ripple_stagger(&self) -> Duration {
        Duration::from_millis(self.ripple_stagger_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_framerate.max(1.0))
    }

    /// Clamp a requested range to the sensitivity limits. The result is
    /// never below `min_distance` nor below one, whatever the limits say.
    pub fn clamp_range(&self, range: f64) -> f64 {
        let floor = self.range_floor.max(self.min_distance).max(MIN_RANGE);
        let ceiling = self.range_ceiling.max(floor);
        if range.is_nan() {
            return floor;
        }
        range.clamp(floor, ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_defaults() {
        let config = RadarConfig::default();
        assert_eq!(config.min_angle, 15.0);
        assert_eq!(config.max_angle, 165.0);
        assert_eq!(config.max_detections, 25);
        assert_eq!(config.detection_lifetime(), Duration::from_secs(15));
        assert_eq!(config.trail_window(), Duration::from_secs(1));
        assert_eq!(config.ripple_stagger(), Duration::from_millis(200));
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = RadarConfig::builder().max_range(200.0).seed(7).build();
        assert_eq!(config.max_range, 200.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.log_rows, 10);
    }

    #[test]
    fn test_clamp_range() {
        let config = RadarConfig::default();
        assert_eq!(config.clamp_range(10.0), 50.0);
        assert_eq!(config.clamp_range(120.0), 120.0);
        assert_eq!(config.clamp_range(1000.0), 300.0);
    }

    #[test]
    fn test_clamp_range_respects_min_distance() {
        let config = RadarConfig::builder().min_distance(60.0).build();
        assert_eq!(config.clamp_range(50.0), 60.0);
        assert_eq!(config.clamp_range(200.0), 200.0);

        let config = RadarConfig::builder()
            .range_floor(0.0)
            .min_distance(0.0)
            .build();
        assert_eq!(config.clamp_range(0.0), 1.0);
        assert_eq!(config.clamp_range(f64::NAN), 1.0);

        let inverted = RadarConfig::builder()
            .range_floor(300.0)
            .range_ceiling(50.0)
            .build();
        assert_eq!(inverted.clamp_range(100.0), 300.0);
    }
}
