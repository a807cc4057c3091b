use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for period keys, effect expiry and boss resets.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    /// Frozen time that tests move forward by hand.
    Fixed(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Clock::Fixed(Arc::new(Mutex::new(at)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at.lock().unwrap_or_else(|p| p.into_inner()),
        }
    }

    /// Move a fixed clock forward. No-op for the system clock.
    pub fn advance(&self, by: Duration) {
        if let Clock::Fixed(at) = self {
            let mut guard = at.lock().unwrap_or_else(|p| p.into_inner());
            *guard += by;
        }
    }
}
