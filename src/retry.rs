//! Bounded retries with a fixed cooldown between attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// How often an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: usize,
    /// Pause between two consecutive attempts
    #[serde(rename = "cooldown_secs", with = "duration_secs")]
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// The last error of an operation that failed on every attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: usize,
    pub last: E,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, cooldown: Duration) -> Self {
        Self {
            max_attempts,
            cooldown,
        }
    }

    /// Run `op` until it succeeds or the attempts run out, sleeping the thread in between.
    ///
    /// The closure receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(usize) -> Result<T, E>,
        E: std::fmt::Display,
    {
        self.run_with_sleep(std::thread::sleep, op)
    }

    /// Same as [`RetryPolicy::run`] with a caller-provided way of waiting.
    pub fn run_with_sleep<T, E, F, S>(&self, mut sleep: S, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(usize) -> Result<T, E>,
        S: FnMut(Duration),
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(last) if attempt >= max_attempts => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last,
                    })
                }
                Err(e) => {
                    warn!(
                        "Attempt {attempt}/{max_attempts} failed: {e}; waiting {:?} before trying again",
                        self.cooldown
                    );
                    sleep(self.cooldown);
                    attempt += 1;
                }
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_on_the_last_attempt() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let mut sleeps = Vec::new();

        let result = policy.run_with_sleep(
            |d| sleeps.push(d),
            |attempt| {
                calls += 1;
                if attempt < 5 {
                    Err(format!("failure {attempt}"))
                } else {
                    Ok(attempt)
                }
            },
        );

        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls, 5);
        assert_eq!(sleeps, vec![Duration::from_secs(60); 4]);
    }

    #[test]
    fn reports_last_error_when_exhausted() {
        let policy = RetryPolicy::new(3, Duration::from_millis(5));
        let mut sleeps = 0;

        let result: Result<(), _> = policy.run_with_sleep(
            |_| sleeps += 1,
            |attempt| Err(format!("failure {attempt}")),
        );

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.last, "failure 3");
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn no_cooldown_after_first_success() {
        let policy = RetryPolicy::default();
        let mut sleeps = 0;
        let result: Result<_, Exhausted<String>> =
            policy.run_with_sleep(|_| sleeps += 1, |attempt| Ok(attempt));
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0;
        let _: Result<(), _> = policy.run_with_sleep(
            |_| {},
            |_| {
                calls += 1;
                Err("nope")
            },
        );
        assert_eq!(calls, 1);
    }
}
