//! Deadline timers
//!
//! The protocol engines never sleep. Delayed work (typematic repeat,
//! self-test replies, the mouse sample clock) is expressed as a deadline that
//! the owning port checks every time it is polled.

/// Microsecond timestamp supplied by the poll loop
pub type Instant = fugit::TimerInstantU64<1_000_000>;

/// Microsecond duration
pub type Duration = fugit::MicrosDurationU64;

/// One-shot or periodic deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Create a disarmed timer
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer to fire `after` from `now`, replacing any pending deadline
    pub fn start(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    /// Disarm the timer
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if a deadline is pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// One-shot expiry: returns true once when the deadline has passed and disarms
    pub fn expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Periodic expiry: returns true when the deadline has passed and re-arms
    /// one `period` after the previous deadline
    ///
    /// If the poll loop fell more than a period behind, the next deadline is
    /// placed one period after `now` instead of firing a burst to catch up.
    pub fn expired_periodic(&mut self, now: Instant, period: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                let next = deadline + period;
                self.deadline = Some(if next > now { next } else { now + period });
                true
            }
            _ => false,
        }
    }
}
