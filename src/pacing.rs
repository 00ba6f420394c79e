//! Fixed-period loop pacing.
//!
//! Each frame's work is timed; the remainder of the period is slept. A
//! frame that overruns its budget is followed immediately by the next one:
//! no catch-up, no skipped frames.

use std::thread;
use std::time::{Duration, Instant};

/// Only the first few slow frames are logged.
const LOGGED_SLOW_FRAMES: u32 = 5;

/// Time left in a frame budget after `elapsed` of work.
pub fn remaining(budget: Duration, elapsed: Duration) -> Duration {
    budget.saturating_sub(elapsed)
}

pub struct FramePacer {
    name: &'static str,
    budget: Duration,
    slow_frames: u32,
}

impl FramePacer {
    pub fn new(name: &'static str, budget: Duration) -> Self {
        Self {
            name,
            budget,
            slow_frames: 0,
        }
    }

    /// Pacer for a target frame rate. `fps` of 0 is treated as 1.
    pub fn from_fps(name: &'static str, fps: u32) -> Self {
        Self::new(name, Duration::from_secs(1) / fps.max(1))
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn slow_frames(&self) -> u32 {
        self.slow_frames
    }

    /// Finish a frame that started at `frame_start`: sleep out the rest of
    /// the budget, or log an overrun. Returns how long it slept.
    pub fn finish_frame(&mut self, frame_start: Instant) -> Duration {
        let elapsed = frame_start.elapsed();
        let sleep = remaining(self.budget, elapsed);

        if sleep.is_zero() && elapsed > self.budget {
            self.slow_frames += 1;
            if self.slow_frames <= LOGGED_SLOW_FRAMES {
                tracing::warn!(
                    "{} frame took {}ms (target: {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    self.budget.as_millis()
                );
            }
        } else {
            thread::sleep(sleep);
        }

        sleep
    }
}
