//! Priority and retry policy for render jobs.

use std::fmt;
use std::time::Duration;

/// Attempts a render gets before its waiters see a terminal error.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default initial delay for exponential backoff.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default cap for exponential backoff.
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Queue priority. Higher values are rendered first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// A client is waiting on the tile.
    pub const HIGH: Priority = Priority(100);

    pub const NORMAL: Priority = Priority(0);

    /// Warming and other speculative work.
    pub const LOW: Priority = Priority(-50);

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::HIGH => write!(f, "high"),
            Self::NORMAL => write!(f, "normal"),
            Self::LOW => write!(f, "low"),
            Self(v) => write!(f, "priority({})", v),
        }
    }
}

/// How a failed render attempt is retried.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// One attempt only.
    None,

    /// Constant delay between attempts.
    Fixed {
        /// Attempts including the first.
        max_attempts: u32,
        delay: Duration,
    },

    /// Delay grows by `multiplier` after each failure, up to `max_delay`.
    ExponentialBackoff {
        /// Attempts including the first.
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    /// Five attempts, requeued immediately.
    fn default() -> Self {
        Self::Fixed {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed {
            max_attempts,
            delay,
        }
    }

    /// Exponential backoff with a 100ms start, 30s cap and factor 2.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Delay before the attempt that follows failed attempt `attempt`
    /// (1-based), or `None` when no attempt is left.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed {
                max_attempts,
                delay,
            } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = (initial_delay.as_millis() as f64 * factor)
                    .min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(delay_ms as u64).min(*max_delay))
            }
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } => *max_attempts,
            Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}
