//! Time management utilities

use std::time::{Duration, Instant};

/// Wall-clock timer driving the model animation and the periodic FPS log
pub struct FrameTimer {
    start: Instant,
    last_report: Instant,
    frames_since_report: u32,
    report_interval: Duration,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl FrameTimer {
    /// Create a timer that reports FPS every `report_interval`
    pub fn new(report_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_report: now,
            frames_since_report: 0,
            report_interval,
        }
    }

    /// Seconds since the timer was created
    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Count one presented frame
    ///
    /// Returns the average FPS over the last interval once the interval has
    /// passed, `None` otherwise.
    pub fn frame_presented(&mut self) -> Option<f32> {
        self.frames_since_report += 1;
        self.report_at(Instant::now())
    }

    fn report_at(&mut self, now: Instant) -> Option<f32> {
        let window = now.duration_since(self.last_report);
        if window < self.report_interval {
            return None;
        }

        let fps = self.frames_since_report as f32 / window.as_secs_f32();
        self.frames_since_report = 0;
        self.last_report = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_before_interval() {
        let mut timer = FrameTimer::new(Duration::from_secs(3600));
        for _ in 0..10 {
            assert!(timer.frame_presented().is_none());
        }
    }

    #[test]
    fn test_report_after_interval_resets_counter() {
        let mut timer = FrameTimer::new(Duration::from_secs(1));
        timer.frames_since_report = 120;
        let later = timer.last_report + Duration::from_secs(2);

        let fps = timer.report_at(later).unwrap();
        assert!((fps - 60.0).abs() < 1e-3);
        assert_eq!(timer.frames_since_report, 0);
        assert!(timer.report_at(later).is_none());
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = FrameTimer::default();
        let a = timer.elapsed_secs();
        let b = timer.elapsed_secs();
        assert!(b >= a);
    }
}
