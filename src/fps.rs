//! Average frame rate over a fixed time window.

use std::time::Duration;

/// Default averaging window.
pub const DEFAULT_FPS_WINDOW: Duration = Duration::from_millis(2000);

/// Rolling frame counter that emits an average once per window.
///
/// The window opens on the first tick. Every tick counts as a frame; when
/// a tick lands at least `window` after the window start, the average over
/// the elapsed time is emitted and a new window starts at that tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRateMonitor {
    window: Duration,
    frame_count: u32,
    window_start: Option<Duration>,
    last_average: Option<f64>,
}

impl FrameRateMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            frame_count: 0,
            window_start: None,
            last_average: None,
        }
    }

    pub fn tick(&mut self, now: Duration) -> Option<f64> {
        self.frame_count += 1;

        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_sub(start);
        if elapsed < self.window || elapsed.is_zero() {
            return None;
        }

        let average = self.frame_count as f64 / elapsed.as_secs_f64();
        self.frame_count = 0;
        self.window_start = Some(now);
        self.last_average = Some(average);
        Some(average)
    }

    /// Forget the open window, e.g. when capture restarts.
    pub fn reset(&mut self) {
        self.frame_count = 0;
        self.window_start = None;
    }

    /// Most recently emitted average.
    pub fn last_average(&self) -> Option<f64> {
        self.last_average
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for FrameRateMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn partial_window_never_emits() {
        let mut fps = FrameRateMonitor::default();
        for t in (0..2000).step_by(33) {
            assert_eq!(fps.tick(ms(t)), None);
        }
        assert_eq!(fps.last_average(), None);
    }

    #[test]
    fn emits_once_at_window_rollover() {
        let mut fps = FrameRateMonitor::default();
        let mut emitted = Vec::new();
        // 41 ticks at 50 ms spacing, 0..=2000 ms
        for i in 0..=40 {
            if let Some(avg) = fps.tick(ms(i * 50)) {
                emitted.push(avg);
            }
        }
        assert_eq!(emitted.len(), 1);
        // 41 frames counted over 2.0 s
        assert!((emitted[0] - 20.5).abs() < 1e-9);
        assert_eq!(fps.last_average(), Some(emitted[0]));
    }

    #[test]
    fn next_window_starts_at_emitting_tick() {
        let mut fps = FrameRateMonitor::default();
        assert_eq!(fps.tick(ms(0)), None);
        assert!(fps.tick(ms(2000)).is_some());
        assert_eq!(fps.tick(ms(3999)), None);
        let avg = fps.tick(ms(4000)).unwrap();
        // two frames (3999 and 4000) over 2 s
        assert!((avg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_reopens_window_on_next_tick() {
        let mut fps = FrameRateMonitor::default();
        fps.tick(ms(0));
        fps.reset();
        assert_eq!(fps.tick(ms(10_000)), None);
        assert_eq!(fps.tick(ms(11_000)), None);
        assert!(fps.tick(ms(12_000)).is_some());
    }
}
