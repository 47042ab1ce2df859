use log::trace;
use std::time::Duration;
use web_time::Instant;

/// Decides when the next frame runs.
///
/// Mirrors a host's animation-frame callback: the call returns once the next frame
/// is due, or `false` when the host is gone and the loop should stop.
pub trait FrameScheduler {
    fn request_animation_frame(&mut self) -> bool;
}

impl<F: FnMut() -> bool> FrameScheduler for F {
    fn request_animation_frame(&mut self) -> bool {
        self()
    }
}

/// Headless pacing at a fixed rate, optionally stopping after a number of frames.
#[derive(Debug, Clone)]
pub struct FixedRateScheduler {
    interval: Duration,
    next: Option<Instant>,
    frames: u64,
    limit: Option<u64>,
}

impl FixedRateScheduler {
    pub const DEFAULT_RATE: f32 = 60.0;

    pub fn new(frames_per_second: f32) -> Self {
        let interval = if frames_per_second > 0.0 {
            Duration::from_secs_f32(1.0 / frames_per_second)
        } else {
            Duration::ZERO
        };

        FixedRateScheduler {
            interval,
            next: None,
            frames: 0,
            limit: None,
        }
    }

    /// Stops the loop after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FixedRateScheduler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATE)
    }
}

impl FrameScheduler for FixedRateScheduler {
    fn request_animation_frame(&mut self) -> bool {
        if self.limit.is_some_and(|limit| self.frames >= limit) {
            trace!("Frame limit of {} reached", self.frames);
            return false;
        }

        let now = Instant::now();
        let due = self.next.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
        }

        // Late frames reset the cadence instead of bursting to catch up.
        self.next = Some(due.max(now) + self.interval);
        self.frames += 1;
        true
    }
}
