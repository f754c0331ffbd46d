//! Wall-clock access for "today" stamps and record timestamps.
//!
//! # Invariants
//! - `today()` is the local calendar date formatted `YYYY-MM-DD`.
//! - `now_ms()` is Unix epoch milliseconds.

use chrono::{Local, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current date and time.
pub trait Clock: Send {
    fn today(&self) -> String;
    fn now_ms(&self) -> i64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }

    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct FixedClock {
    reading: Arc<Mutex<(String, i64)>>,
}

impl FixedClock {
    pub fn new(today: &str, now_ms: i64) -> Self {
        Self {
            reading: Arc::new(Mutex::new((today.to_string(), now_ms))),
        }
    }

    pub fn set_today(&self, today: &str) {
        if let Ok(mut reading) = self.reading.lock() {
            reading.0 = today.to_string();
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        if let Ok(mut reading) = self.reading.lock() {
            reading.1 += delta_ms;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> String {
        self.reading
            .lock()
            .map(|reading| reading.0.clone())
            .unwrap_or_default()
    }

    fn now_ms(&self) -> i64 {
        self.reading.lock().map(|reading| reading.1).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, SystemClock};
    use chrono::NaiveDate;

    #[test]
    fn system_clock_formats_iso_date() {
        let today = SystemClock.today();
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
        assert!(SystemClock.now_ms() > 0);
    }

    #[test]
    fn fixed_clock_clones_share_reading() {
        let clock = FixedClock::new("2026-10-17", 1_000);
        let view = clock.clone();
        clock.set_today("2026-10-18");
        clock.advance_ms(500);
        assert_eq!(view.today(), "2026-10-18");
        assert_eq!(view.now_ms(), 1_500);
    }
}
