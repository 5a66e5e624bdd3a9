use rand::Rng;
use std::thread;
use std::time::Duration;

/// Share of the configured delay range used when targets run in parallel.
const PARALLEL_FACTOR: f64 = 0.3;

/// Randomized politeness delay between requests to the same provider.
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    min_secs: f64,
    max_secs: f64,
    enabled: bool,
}

impl Jitter {
    /// `min_secs..=max_secs` in sequential mode, scaled down in parallel mode.
    pub fn new(parallel: bool, min_secs: f64, max_secs: f64) -> Self {
        let (min_secs, max_secs) = if min_secs <= max_secs {
            (min_secs, max_secs)
        } else {
            (max_secs, min_secs)
        };
        let factor = if parallel { PARALLEL_FACTOR } else { 1.0 };
        Self {
            min_secs: min_secs.max(0.0) * factor,
            max_secs: max_secs.max(0.0) * factor,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            min_secs: 0.0,
            max_secs: 0.0,
            enabled: false,
        }
    }

    /// Next delay to apply, or zero when disabled.
    pub fn next_delay(&self) -> Duration {
        if !self.enabled || self.max_secs <= 0.0 {
            return Duration::ZERO;
        }
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs)
    }

    pub fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_delay_within_range() {
        let jitter = Jitter::new(false, 0.5, 1.0);
        for _ in 0..50 {
            let d = jitter.next_delay().as_secs_f64();
            assert!((0.5..=1.0).contains(&d), "{} out of range", d);
        }
    }

    #[test]
    fn test_parallel_delay_is_narrowed() {
        let jitter = Jitter::new(true, 2.0, 4.0);
        for _ in 0..50 {
            let d = jitter.next_delay().as_secs_f64();
            assert!(d >= 0.6 - 1e-9 && d <= 1.2 + 1e-9, "{} out of range", d);
        }
    }

    #[test]
    fn test_disabled_never_sleeps() {
        assert_eq!(Jitter::disabled().next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_swapped_bounds_are_normalized() {
        let jitter = Jitter::new(false, 1.0, 0.5);
        let d = jitter.next_delay().as_secs_f64();
        assert!((0.5..=1.0).contains(&d));
    }
}
