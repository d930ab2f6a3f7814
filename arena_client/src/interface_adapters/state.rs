use crate::domain::Clock;
use std::time::Instant;

// System clock adapter used by the reconciler's flash window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
