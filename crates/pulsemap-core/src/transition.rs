//! Transitions - interpolation between two parameter presets
//!
//! Progress is either time-driven (computed from the start time on every
//! poll) or set from outside. Setting progress directly switches an instance
//! to external driving.

use crate::parameters::ParameterSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drive {
    External,
    Timed { started_at: Instant, duration: Duration },
}

/// Two presets plus a progress scalar in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    start: ParameterSet,
    end: ParameterSet,
    progress: f32,
    drive: Drive,
}

impl Transition {
    /// Externally driven transition at progress 0
    pub fn new(start: ParameterSet, end: ParameterSet) -> Self {
        Self {
            start,
            end,
            progress: 0.0,
            drive: Drive::External,
        }
    }

    /// Begin a timed run from now
    pub fn start(&mut self, duration: Duration) {
        self.start_at(duration, Instant::now());
    }

    /// Begin a timed run from `now`. A zero duration sits at the end preset.
    pub fn start_at(&mut self, duration: Duration, now: Instant) {
        self.progress = 0.0;
        self.drive = Drive::Timed {
            started_at: now,
            duration,
        };
    }

    /// Set progress directly, clamped to [0, 1]. NaN reads as 0.
    pub fn set_progress(&mut self, progress: f32) {
        self.drive = Drive::External;
        self.progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
    }

    /// True when progress is computed from elapsed time
    pub fn is_timed(&self) -> bool {
        matches!(self.drive, Drive::Timed { .. })
    }

    /// Current progress
    pub fn progress(&self) -> f32 {
        self.progress_at(Instant::now())
    }

    /// Progress as of `now`
    pub fn progress_at(&self, now: Instant) -> f32 {
        match self.drive {
            Drive::External => self.progress,
            Drive::Timed {
                started_at,
                duration,
            } => {
                if duration.is_zero() {
                    return 1.0;
                }
                let elapsed = now.saturating_duration_since(started_at);
                (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32
            }
        }
    }

    /// Whether the end preset has been reached
    pub fn is_complete_at(&self, now: Instant) -> bool {
        self.progress_at(now) >= 1.0
    }

    /// Interpolated preset at the current progress
    pub fn interpolated(&self) -> ParameterSet {
        self.interpolated_at(Instant::now())
    }

    /// Interpolated preset as of `now`
    pub fn interpolated_at(&self, now: Instant) -> ParameterSet {
        self.start.lerp(&self.end, self.progress_at(now))
    }
}

/// Map `value` from the window `[threshold, max]` onto [0, 1].
///
/// Values at or below `threshold` give 0, at or above `max` give 1. An empty
/// window acts as a step at `threshold`.
pub fn remap_progress(value: f32, threshold: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    if max <= threshold {
        return if value > threshold { 1.0 } else { 0.0 };
    }
    ((value - threshold) / (max - threshold)).clamp(0.0, 1.0)
}
