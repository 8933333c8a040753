use std::time::{Duration, Instant};

/// Interval between title refreshes.
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Frame statistics for the window title.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report: Instant,
    frame_count: u32,
    frame_dt: f32,
    render_ms: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String, now: Instant) -> Self {
        Self {
            last_frame_time: None,
            last_report: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            render_ms: 0.0,
            base_title,
        }
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.render_ms = render_ms;
    }

    /// Records a frame. Returns a new window title every [`REPORT_INTERVAL`].
    pub fn update(&mut self, now: Instant) -> Option<String> {
        if let Some(last) = self.last_frame_time {
            self.frame_dt = now.saturating_duration_since(last).as_secs_f32();
        }
        self.last_frame_time = Some(now);
        self.frame_count = self.frame_count.saturating_add(1);

        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_report = now;
        Some(format!(
            "{} - {:.1} fps (cadence {:.2} ms, render {:.2} ms)",
            self.base_title,
            fps,
            self.frame_dt * 1000.0,
            self.render_ms
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_twice_per_second() {
        let start = Instant::now();
        let mut timing = FrameTiming::new("vitrine".to_string(), start);
        timing.set_render_ms(1.5);
        let mut titles = Vec::new();
        for frame in 1..=60u64 {
            if let Some(title) = timing.update(start + Duration::from_micros(16_667 * frame)) {
                titles.push(title);
            }
        }
        assert_eq!(titles.len(), 2);
        assert!(titles[0].starts_with("vitrine - "));
        assert!(titles[0].contains("render 1.50 ms"));
    }
}
