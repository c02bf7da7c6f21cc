//! Simulation time
//!
//! Every time-based rule (hit cooldown, barrier dedupe, effect expiry,
//! pickup activation, probe resizing) reads the fixed-step clock, so replays
//! are exact. Hosts timing real frames use `now_ms`.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    elapsed_ms: f64,
    ticks: u64,
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.elapsed_ms += f64::from(dt) * 1000.0;
        self.ticks += 1;
    }

    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.elapsed_ms
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Host timestamp if one is supplied, else a wall-clock read
pub fn now_ms(host_ms: Option<f64>) -> f64 {
    host_ms.unwrap_or_else(wall_clock_ms)
}

fn wall_clock_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_accumulates_ticks() {
        let mut clock = SimClock::default();
        for _ in 0..60 {
            clock.advance(1.0 / 60.0);
        }
        assert_eq!(clock.ticks(), 60);
        assert!((clock.now_ms() - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_host_time_wins_over_wall_clock() {
        assert_eq!(now_ms(Some(42.0)), 42.0);
        assert!(now_ms(None) > 0.0);
    }
}
