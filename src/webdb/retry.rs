use std::time::Duration;

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::error::WebError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Jittered exponential backoff for data requests.
/// After failed attempt `n` (starting at 0) the wait is uniform in
/// `[0, base_delay * 2^n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Requests made before giving up. The first request always goes out,
    /// so 0 behaves like 1; configs reject it.
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
    pub fn delay(&self, attempt: u32, rng: &mut StdRng) -> Duration {
        let base_ms = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let upper = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        if upper == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..upper))
    }
}

/// Serialized form of [`RetryPolicy`] in folder configs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl TryFrom<RetryConfig> for RetryPolicy {
    type Error = WebError;

    fn try_from(value: RetryConfig) -> Result<Self, Self::Error> {
        if value.max_attempts == 0 {
            return Err(WebError::InvalidRetry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts: value.max_attempts,
            base_delay: Duration::from_millis(value.base_delay_ms),
        })
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_delay_ranges() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..DEFAULT_MAX_ATTEMPTS {
            let ceiling = Duration::from_secs(5 * (1 << attempt));
            for _ in 0..200 {
                assert!(policy.delay(attempt, &mut rng) < ceiling);
            }
        }
    }

    #[test]
    fn test_delay_is_seeded() {
        let policy = RetryPolicy::default();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let da: Vec<_> = (0..7).map(|n| policy.delay(n, &mut a)).collect();
        let db: Vec<_> = (0..7).map(|n| policy.delay(n, &mut b)).collect();
        assert_eq!(da, db);
    }

    #[test]
    fn test_delay_edges() {
        let mut rng = StdRng::seed_from_u64(0);
        let zero = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        };
        assert_eq!(zero.delay(2, &mut rng), Duration::ZERO);

        // huge attempt index saturates instead of overflowing
        let policy = RetryPolicy::default();
        let _ = policy.delay(200, &mut rng);
    }

    #[test]
    fn test_config_conversion() {
        let policy = RetryPolicy::try_from(RetryConfig::default()).unwrap();
        assert_eq!(policy, RetryPolicy::default());

        let cfg = RetryConfig {
            max_attempts: 0,
            base_delay_ms: 100,
        };
        assert!(matches!(
            RetryPolicy::try_from(cfg),
            Err(WebError::InvalidRetry(_))
        ));
    }
}
