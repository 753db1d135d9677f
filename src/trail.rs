use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub angle: f64,
    pub created_at: Duration,
}

/// Recent beam angles, oldest first, kept for a fixed window.
#[derive(Debug, Clone)]
pub struct TrailBuffer {
    points: VecDeque<TrailPoint>,
    window: Duration,
}

impl TrailBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            points: VecDeque::new(),
            window,
        }
    }

    pub fn record(&mut self, angle: f64, now: Duration) {
        self.points.push_back(TrailPoint {
            angle,
            created_at: now,
        });
    }

    /// Drop every point whose age has reached the window.
    pub fn prune(&mut self, now: Duration) {
        let window = self.window;
        self.points
            .retain(|point| now.saturating_sub(point.created_at) < window);
    }

    pub fn opacity_of(&self, point: &TrailPoint, now: Duration) -> f64 {
        let age = now.saturating_sub(point.created_at).as_secs_f64();
        (1.0 - age / self.window.as_secs_f64()).max(0.0)
    }

    /// `(angle, opacity)` pairs for drawing.
    pub fn points(&self, now: Duration) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .map(move |point| (point.angle, self.opacity_of(point, now)))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_log::test;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_prune_drops_expired_points() {
        let mut trail = TrailBuffer::new(ms(1000));
        trail.record(15.0, ms(0));
        trail.record(16.5, ms(500));
        trail.record(18.0, ms(999));

        trail.prune(ms(999));
        assert_eq!(trail.len(), 3);

        // Age exactly equal to the window is gone.
        trail.prune(ms(1000));
        assert_eq!(trail.len(), 2);

        trail.prune(ms(1999));
        assert_eq!(trail.len(), 0);
        assert!(trail.is_empty());
    }

    #[test]
    fn test_opacity_fades_linearly() {
        let mut trail = TrailBuffer::new(ms(1000));
        trail.record(90.0, ms(0));
        let point = trail.points.front().copied().unwrap();

        assert_relative_eq!(trail.opacity_of(&point, ms(0)), 1.0);
        assert_relative_eq!(trail.opacity_of(&point, ms(250)), 0.75);
        assert_relative_eq!(trail.opacity_of(&point, ms(1000)), 0.0);
        assert_relative_eq!(trail.opacity_of(&point, ms(5000)), 0.0);
    }

    #[test]
    fn test_points_yields_angle_and_opacity() {
        let mut trail = TrailBuffer::new(ms(1000));
        trail.record(30.0, ms(0));
        trail.record(31.5, ms(500));
        let points: Vec<_> = trail.points(ms(500)).collect();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].0, 30.0);
        assert_relative_eq!(points[0].1, 0.5);
        assert_relative_eq!(points[1].1, 1.0);
    }

    #[test]
    fn test_no_stale_points_after_prune() {
        let mut trail = TrailBuffer::new(ms(1000));
        for tick in 0..500u64 {
            let now = ms(tick * 16);
            trail.record(15.0 + tick as f64, now);
            trail.prune(now);
            assert!(trail
                .points
                .iter()
                .all(|p| now.saturating_sub(p.created_at) < ms(1000)));
        }
    }
}
