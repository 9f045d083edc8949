use std::time::{Duration, Instant};

/// Fixed-schedule frame pacing.
///
/// Slot `n` lands at `anchor + n * interval`, so small per-frame jitter does
/// not accumulate into drift. When a caller falls more than one full
/// interval behind, the schedule re-anchors at the current time instead of
/// releasing a burst of catch-up frames.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    next_slot: Option<Instant>,
}

impl FramePacer {
    pub fn new(fps: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps),
            next_slot: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Advances the schedule and returns how long to wait from `now`.
    pub fn delay_until_next(&mut self, now: Instant) -> Duration {
        let target = self.next_slot.unwrap_or(now + self.interval);

        if now > target + self.interval {
            log::debug!(
                "Frame pacing fell behind by {:?}, re-anchoring",
                now - target
            );
            self.next_slot = Some(now + self.interval);
            return Duration::ZERO;
        }

        self.next_slot = Some(target + self.interval);
        target.saturating_duration_since(now)
    }

    /// Sleeps until the next slot.
    pub fn wait(&mut self) {
        let delay = self.delay_until_next(Instant::now());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
