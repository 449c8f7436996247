//! Rolling frame statistics.
//!
//! Counts frames, keyframes and wire bytes over a fixed wall-clock
//! window. When the window has elapsed the caller takes a
//! [`StatsReport`] and the window counters start again from zero.
//! Lifetime totals are kept alongside for the final summary.

use std::fmt;
use std::time::{Duration, Instant};

/// Default reporting interval.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(15);

// ── Counters ─────────────────────────────────────────────────────

/// Raw counters for one window (or a whole run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub frames: u64,
    pub keyframes: u64,
    pub bytes: u64,
}

impl Counters {
    fn record(&mut self, bytes: usize, keyframe: bool) {
        self.frames += 1;
        self.keyframes += keyframe as u64;
        self.bytes += bytes as u64;
    }
}

// ── StatsReport ──────────────────────────────────────────────────

/// Counters for a finished window together with its duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub counters: Counters,
    pub elapsed: Duration,
}

impl StatsReport {
    /// Frames per second over the window.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.counters.frames as f64 / secs
    }

    /// Mean wire bytes per frame.
    pub fn avg_frame_size(&self) -> f64 {
        if self.counters.frames == 0 {
            return 0.0;
        }
        self.counters.bytes as f64 / self.counters.frames as f64
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total frames: {}, Avg framerate: {:.2}, Key frames: {}, Bytes: {}, Avg framesize: {:.1}",
            self.counters.frames,
            self.frame_rate(),
            self.counters.keyframes,
            self.counters.bytes,
            self.avg_frame_size(),
        )
    }
}

// ── StatsAccumulator ─────────────────────────────────────────────

/// Windowed frame counters.
pub struct StatsAccumulator {
    interval: Duration,
    started: Instant,
    window_start: Instant,
    window: Counters,
    total: Counters,
}

impl StatsAccumulator {
    /// Start accumulating now, reporting every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Start accumulating at an explicit instant (useful for testing).
    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            started: now,
            window_start: now,
            window: Counters::default(),
            total: Counters::default(),
        }
    }

    /// Record one frame of `bytes` wire bytes.
    pub fn record(&mut self, bytes: usize, keyframe: bool) {
        self.window.record(bytes, keyframe);
        self.total.record(bytes, keyframe);
    }

    /// If the window has elapsed at `now`, close it and return its report.
    pub fn maybe_report(&mut self, now: Instant) -> Option<StatsReport> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= self.interval {
            return None;
        }
        let report = StatsReport {
            counters: self.window,
            elapsed,
        };
        self.window = Counters::default();
        self.window_start = now;
        Some(report)
    }

    /// Counters of the window in progress.
    pub fn window(&self) -> Counters {
        self.window
    }

    /// Counters since the accumulator was created.
    pub fn total(&self) -> Counters {
        self.total
    }

    /// Lifetime report as of `now`.
    pub fn summary(&self, now: Instant) -> StatsReport {
        StatsReport {
            counters: self.total,
            elapsed: now.saturating_duration_since(self.started),
        }
    }
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_STATS_INTERVAL)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_and_keyframes() {
        let mut stats = StatsAccumulator::default();
        stats.record(100, true);
        stats.record(20, false);
        stats.record(30, false);
        assert_eq!(
            stats.window(),
            Counters {
                frames: 3,
                keyframes: 1,
                bytes: 150
            }
        );
        assert_eq!(stats.total(), stats.window());
    }

    #[test]
    fn no_report_inside_window() {
        let t0 = Instant::now();
        let mut stats = StatsAccumulator::starting_at(Duration::from_secs(15), t0);
        stats.record(10, false);
        assert!(stats.maybe_report(t0 + Duration::from_secs(15)).is_none());
        assert_eq!(stats.window().frames, 1);
    }

    #[test]
    fn report_resets_window_only() {
        let t0 = Instant::now();
        let mut stats = StatsAccumulator::starting_at(Duration::from_secs(15), t0);
        for _ in 0..30 {
            stats.record(50, false);
        }

        let report = stats.maybe_report(t0 + Duration::from_secs(16)).unwrap();
        assert_eq!(report.counters.frames, 30);
        assert_eq!(report.counters.bytes, 1500);
        assert!((report.avg_frame_size() - 50.0).abs() < 1e-9);
        assert!((report.frame_rate() - 30.0 / 16.0).abs() < 1e-9);

        assert_eq!(stats.window(), Counters::default());
        assert_eq!(stats.total().frames, 30);

        // The next window starts at the report time.
        assert!(stats.maybe_report(t0 + Duration::from_secs(30)).is_none());
    }

    #[test]
    fn empty_report_has_no_averages() {
        let report = StatsReport {
            counters: Counters::default(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.frame_rate(), 0.0);
        assert_eq!(report.avg_frame_size(), 0.0);
        assert!(report.to_string().starts_with("Total frames: 0"));
    }
}
