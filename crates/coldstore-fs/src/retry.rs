use std::thread;
use std::time::Duration;

/// Delay schedule applied between two failed attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// `initial + step * attempt`
    Linear { initial: Duration, step: Duration },
    /// `base * 2^attempt`
    Exponential { base: Duration },
}

impl Backoff {
    /// Delay to wait after attempt number `attempt` (0-indexed) failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use coldstore_fs::Backoff;
    ///
    /// let linear = Backoff::Linear {
    ///     initial: Duration::from_millis(500),
    ///     step: Duration::from_millis(500),
    /// };
    /// assert_eq!(linear.delay(0), Duration::from_millis(500));
    /// assert_eq!(linear.delay(2), Duration::from_millis(1500));
    ///
    /// let exp = Backoff::Exponential { base: Duration::from_millis(100) };
    /// assert_eq!(exp.delay(3), Duration::from_millis(800));
    /// ```
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { initial, step } => initial.saturating_add(step.saturating_mul(attempt)),
            Backoff::Exponential { base } => base.saturating_mul(2_u32.saturating_pow(attempt)),
        }
    }
}

/// Bounded retry policy: at most `max_attempts` calls, `backoff` between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff:      Backoff,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Single file removal: 8 attempts, 0.5s + 0.5s per attempt.
    pub const fn file_removal() -> Self {
        Self::new(8, Backoff::Linear {
            initial: Duration::from_millis(500),
            step:    Duration::from_millis(500),
        })
    }

    /// Whole directory removal: 5 attempts, 1.0s + 0.8s per attempt.
    pub const fn dir_removal() -> Self {
        Self::new(5, Backoff::Linear {
            initial: Duration::from_millis(1000),
            step:    Duration::from_millis(800),
        })
    }

    /// Stale entries found by the orphan sweep get fewer attempts.
    pub const fn orphan_removal() -> Self {
        Self::new(3, Backoff::Linear {
            initial: Duration::from_millis(500),
            step:    Duration::from_millis(500),
        })
    }

    pub const fn immediate(max_attempts: u32) -> Self { Self::new(max_attempts, Backoff::None) }

    pub fn max_attempts(&self) -> u32 { self.max_attempts.max(1) }

    pub fn backoff(&self) -> Backoff { self.backoff }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Run `op` until it succeeds or the policy is exhausted, sleeping between attempts.
///
/// `op` receives the 0-indexed attempt number. The last error is returned.
pub fn retry<T, E, F>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    retry_with(policy, op, thread::sleep)
}

/// [`retry`] with an injectable sleeper.
pub fn retry_with<T, E, F, S>(policy: &RetryPolicy, mut op: F, mut sleep: S) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    S: FnMut(Duration),
    E: std::fmt::Display,
{
    let max = policy.max_attempts();
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < max => {
                let delay = policy.backoff.delay(attempt);
                tracing::debug!(attempt = attempt + 1, max, ?delay, %err, "attempt failed, retrying");
                sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
