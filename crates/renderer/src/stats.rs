use std::collections::VecDeque;
use std::time::Duration;

/// Number of frame durations kept for the rolling estimate.
pub const FPS_WINDOW: usize = 30;

/// Coarse smoothness bucket for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRateTier {
    /// 50 fps or better.
    Smooth,
    /// 30 fps or better.
    Fair,
    Slow,
}

/// Rolling frame-rate estimate over the last [`FPS_WINDOW`] frames.
#[derive(Debug, Clone, Default)]
pub struct FrameRateMonitor {
    samples: VecDeque<Duration>,
}

impl FrameRateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame_time: Duration) {
        if self.samples.len() == FPS_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frames per second, or `None` before the first frame or when every
    /// recorded frame took no measurable time.
    pub fn estimate(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        let mean = total.as_secs_f64() / self.samples.len() as f64;
        (mean > 0.0).then(|| 1.0 / mean)
    }

    pub fn label(&self) -> String {
        match self.estimate() {
            Some(fps) => format!("FPS: {fps:.1}"),
            None => "FPS: --".to_string(),
        }
    }

    pub fn tier(&self) -> Option<FrameRateTier> {
        self.estimate().map(|fps| {
            if fps >= 50.0 {
                FrameRateTier::Smooth
            } else if fps >= 30.0 {
                FrameRateTier::Fair
            } else {
                FrameRateTier::Slow
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_monitor_has_no_estimate() {
        let monitor = FrameRateMonitor::new();
        assert_eq!(monitor.estimate(), None);
        assert_eq!(monitor.label(), "FPS: --");
        assert_eq!(monitor.tier(), None);
    }

    #[test]
    fn zero_durations_do_not_divide_by_zero() {
        let mut monitor = FrameRateMonitor::new();
        monitor.record(Duration::ZERO);
        assert_eq!(monitor.estimate(), None);
    }

    #[test]
    fn reciprocal_of_mean_frame_time() {
        let mut monitor = FrameRateMonitor::new();
        monitor.record(Duration::from_millis(10));
        monitor.record(Duration::from_millis(30));
        let fps = monitor.estimate().unwrap();
        assert!((fps - 50.0).abs() < 1e-9);
        assert_eq!(monitor.label(), "FPS: 50.0");
        assert_eq!(monitor.tier(), Some(FrameRateTier::Smooth));
    }

    #[test]
    fn evicts_oldest_samples() {
        let mut monitor = FrameRateMonitor::new();
        monitor.record(Duration::from_secs(10));
        for _ in 0..FPS_WINDOW {
            monitor.record(Duration::from_millis(25));
        }
        assert_eq!(monitor.len(), FPS_WINDOW);
        let fps = monitor.estimate().unwrap();
        assert!((fps - 40.0).abs() < 1e-9);
        assert_eq!(monitor.tier(), Some(FrameRateTier::Fair));
    }

    #[test]
    fn slow_tier_below_thirty() {
        let mut monitor = FrameRateMonitor::new();
        monitor.record(Duration::from_millis(100));
        assert_eq!(monitor.tier(), Some(FrameRateTier::Slow));
        assert_eq!(monitor.label(), "FPS: 10.0");
    }
}
