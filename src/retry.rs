use std::fmt::Display;
use std::time::Duration;

/// Blocks the calling thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded retry with a doubling delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// The last error once every attempt has failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt` until it succeeds or the budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number. Every error is treated
    /// as retryable. Returns the value and the number of attempts used.
    pub fn run<T, E, S, F>(&self, sleeper: &S, mut attempt: F) -> Result<(T, u32), Exhausted<E>>
    where
        E: Display,
        S: Sleeper + ?Sized,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempts = 0;
        let mut delay = self.initial_delay;

        loop {
            attempts += 1;
            match attempt(attempts) {
                Ok(value) => return Ok((value, attempts)),
                Err(e) => {
                    log::warn!("Attempt {}/{} failed: {}", attempts, self.max_attempts, e);
                    if attempts >= self.max_attempts {
                        return Err(Exhausted {
                            last_error: e,
                            attempts,
                        });
                    }
                    log::info!("Retrying in {}s", delay.as_secs());
                    sleeper.sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: RefCell<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn seconds(&self) -> Vec<u64> {
            self.slept.borrow().iter().map(|d| d.as_secs()).collect()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.borrow_mut().push(duration);
        }
    }

    #[test]
    fn test_first_attempt_success_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let result = RetryPolicy::default().run(&sleeper, |_| Ok::<_, String>("sent"));

        assert_eq!(result.unwrap(), ("sent", 1));
        assert!(sleeper.seconds().is_empty());
    }

    #[test]
    fn test_always_failing_uses_full_budget() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let result = RetryPolicy::default().run(&sleeper, |n| {
            calls += 1;
            Err::<(), _>(format!("failure {}", n))
        });

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 5);
        assert_eq!(exhausted.last_error, "failure 5");
        assert_eq!(calls, 5);
        assert_eq!(sleeper.seconds(), vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_recovers_after_two_failures() {
        let sleeper = RecordingSleeper::default();
        let result = RetryPolicy::default().run(&sleeper, |n| {
            if n <= 2 {
                Err("busy")
            } else {
                Ok(n)
            }
        });

        assert_eq!(result.unwrap(), (3, 3));
        assert_eq!(sleeper.seconds(), vec![1, 2]);
    }
}
