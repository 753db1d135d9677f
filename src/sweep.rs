/// Beam direction of travel across the arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::CounterClockwise => 1.0,
            Direction::Clockwise => -1.0,
        }
    }
}

/// Current beam angle in degrees, reflecting between `min` and `max`.
#[derive(Debug, Clone)]
pub struct SweepState {
    angle: f64,
    direction: Direction,
    min: f64,
    max: f64,
}

impl SweepState {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            angle: min,
            direction: Direction::CounterClockwise,
            min,
            max,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Move the beam by `step` degrees. Landing on or past a bound clamps
    /// to it and reverses the direction.
    pub fn advance(&mut self, step: f64) {
        self.angle += self.direction.sign() * step;
        if self.angle >= self.max {
            self.angle = self.max;
            self.direction = Direction::Clockwise;
        } else if self.angle <= self.min {
            self.angle = self.min;
            self.direction = Direction::CounterClockwise;
        }
    }

    #[cfg(test)]
    fn at(angle: f64, direction: Direction) -> Self {
        Self {
            angle,
            direction,
            min: 15.0,
            max: 165.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_log::test;

    #[test]
    fn test_starts_at_lower_bound() {
        let sweep = SweepState::new(15.0, 165.0);
        assert_eq!(sweep.angle(), 15.0);
        assert_eq!(sweep.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn test_reflects_at_upper_bound() {
        let mut sweep = SweepState::at(165.0, Direction::CounterClockwise);
        sweep.advance(1.5);
        assert_eq!(sweep.angle(), 165.0);
        assert_eq!(sweep.direction(), Direction::Clockwise);

        sweep.advance(1.5);
        assert_relative_eq!(sweep.angle(), 163.5);
        assert_eq!(sweep.direction(), Direction::Clockwise);
    }

    #[test]
    fn test_reflects_at_lower_bound() {
        let mut sweep = SweepState::at(16.0, Direction::Clockwise);
        sweep.advance(1.5);
        assert_eq!(sweep.angle(), 15.0);
        assert_eq!(sweep.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn test_stays_in_bounds() {
        let mut sweep = SweepState::new(15.0, 165.0);
        let mut flips = 0;
        let mut last = sweep.direction();
        for _ in 0..10_000 {
            sweep.advance(1.5);
            assert!(sweep.angle() >= 15.0 && sweep.angle() <= 165.0);
            if sweep.direction() != last {
                assert!(sweep.angle() == 15.0 || sweep.angle() == 165.0);
                flips += 1;
                last = sweep.direction();
            }
        }
        // 150 degrees at 1.5 per tick is 100 ticks per pass
        assert_eq!(flips, 100);
    }
}
