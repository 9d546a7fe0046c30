use std::time::{Duration, Instant};

/// Wall-clock limit carried into long-running calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    expires: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            expires: started + budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.expires - self.started
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires
    }
}
