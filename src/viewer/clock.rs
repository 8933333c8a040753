use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the first tick.
    pub elapsed: f32,
    /// Seconds since the previous tick; zero on the first.
    pub delta: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    start: Option<Instant>,
    last: Option<Instant>,
}

impl FrameClock {
    pub fn advance(&mut self, now: Instant) -> FrameTime {
        let start = *self.start.get_or_insert(now);
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        FrameTime {
            elapsed: now.saturating_duration_since(start).as_secs_f32(),
            delta: delta.as_secs_f32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_delta() {
        let mut clock = FrameClock::default();
        let t0 = Instant::now();
        assert_eq!(clock.advance(t0), FrameTime::default());
        let t1 = t0 + Duration::from_millis(250);
        let time = clock.advance(t1);
        assert!((time.delta - 0.25).abs() < 1e-6);
        assert!((time.elapsed - 0.25).abs() < 1e-6);
        let time = clock.advance(t1 + Duration::from_millis(500));
        assert!((time.delta - 0.5).abs() < 1e-6);
        assert!((time.elapsed - 0.75).abs() < 1e-6);
    }
}
