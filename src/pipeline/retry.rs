use std::cell::RefCell;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Bounded attempts with linear backoff: the wait after attempt `n` is `base_delay * n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Wait before the next try, after `attempt` (1-based) failed. `None` once exhausted.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts.max(1) {
            return None;
        }
        Some(self.base_delay.saturating_mul(attempt))
    }

    /// Runs `op` until it succeeds or attempts run out. `op` receives the 1-based attempt
    /// number; `on_error` sees every failure before the wait.
    pub fn run<T, E>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: impl FnMut(u32) -> Result<T, E>,
        mut on_error: impl FnMut(u32, &E),
    ) -> Result<T, Exhausted<E>> {
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    on_error(attempt, &e);
                    match self.delay_after(attempt) {
                        Some(d) => {
                            sleeper.sleep(d);
                            attempt += 1;
                        }
                        None => {
                            return Err(Exhausted {
                                attempts: attempt,
                                last_error: e,
                            })
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

pub trait Sleeper {
    fn sleep(&self, d: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, d: Duration) {
        self.waits.borrow_mut().push(d);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{RecordingSleeper, RetryPolicy};

    #[test]
    fn linear_backoff_schedule() {
        let p = RetryPolicy::new(4, Duration::from_secs(2));
        assert_eq!(p.delay_after(1), Some(Duration::from_secs(2)));
        assert_eq!(p.delay_after(2), Some(Duration::from_secs(4)));
        assert_eq!(p.delay_after(3), Some(Duration::from_secs(6)));
        assert_eq!(p.delay_after(4), None);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn succeeds_on_last_attempt() {
        let p = RetryPolicy::new(3, Duration::from_millis(10));
        let sleeper = RecordingSleeper::new();
        let mut seen = Vec::new();
        let out: Result<u32, _> = p.run(
            &sleeper,
            |n| if n < 3 { Err("boom") } else { Ok(n) },
            |n, _| seen.push(n),
        );
        assert_eq!(out.unwrap(), 3);
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(sleeper.waits(), vec![Duration::from_millis(10), Duration::from_millis(20)]);
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let p = RetryPolicy::new(2, Duration::from_millis(5));
        let sleeper = RecordingSleeper::new();
        let err = p
            .run(&sleeper, |_| Err::<(), _>("down"), |_, _| {})
            .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last_error, "down");
        assert_eq!(sleeper.waits().len(), 1);
    }
}
