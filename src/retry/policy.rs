use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry with randomized exponential backoff.
///
/// After the `n`-th failed attempt the nominal wait is
/// `initial_interval_ms * multiplier^(n-1)`, capped at `max_interval_ms`.
/// The actual wait is drawn uniformly from `nominal * (1 ± jitter)`, again
/// capped, so competing togglers do not wake up in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    /// Relative spread around each nominal interval, in `[0, 1)`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_interval_ms: 200,
            multiplier: 1.8,
            max_interval_ms: 2_500,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be > 0".to_string());
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("multiplier must be >= 1.0".to_string());
        }

        if !(0.0..1.0).contains(&self.jitter) {
            return Err("jitter must be within [0, 1)".to_string());
        }

        if self.max_interval_ms < self.initial_interval_ms {
            return Err("max_interval_ms cannot be below initial_interval_ms".to_string());
        }

        Ok(())
    }

    fn cap_ms(&self) -> f64 {
        self.max_interval_ms.max(self.initial_interval_ms) as f64
    }

    fn nominal_ms(&self, retry: u32) -> f64 {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let growth = self.multiplier.max(1.0).powi(exponent);
        (self.initial_interval_ms as f64 * growth).min(self.cap_ms())
    }

    /// Un-jittered wait after the `retry`-th failed attempt (1-based).
    pub fn nominal_backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.nominal_ms(retry).round() as u64)
    }

    /// Inclusive range every jittered wait after the `retry`-th failure falls in.
    pub fn backoff_bounds(&self, retry: u32) -> (Duration, Duration) {
        let (low, high) = self.bounds_ms(retry);
        (Duration::from_millis(low), Duration::from_millis(high))
    }

    fn bounds_ms(&self, retry: u32) -> (u64, u64) {
        let nominal = self.nominal_ms(retry);
        let jitter = self.jitter.clamp(0.0, 1.0);
        let low = (nominal * (1.0 - jitter)).round() as u64;
        let high = (nominal * (1.0 + jitter)).min(self.cap_ms()).round() as u64;
        (low, high.max(low))
    }

    /// Jittered wait after the `retry`-th failed attempt.
    pub fn backoff<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let (low, high) = self.bounds_ms(retry);
        if high == low {
            return Duration::from_millis(low);
        }
        Duration::from_millis(rng.gen_range(low..=high))
    }

    /// Nominal waits between consecutive attempts, one per possible retry.
    pub fn curve(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|retry| self.nominal_backoff(retry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn test_default_curve() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.curve(), ms(&[200, 360, 648, 1166, 2100]));
    }

    #[test]
    fn test_curve_is_capped() {
        let policy = RetryPolicy::default().max_attempts(10);
        let curve = policy.curve();
        assert_eq!(curve.len(), 9);
        assert!(curve[5..].iter().all(|d| *d == Duration::from_millis(2_500)));
    }

    #[test]
    fn test_jittered_backoff_stays_in_bounds() {
        let policy = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for retry in 1..policy.max_attempts {
            let (low, high) = policy.backoff_bounds(retry);
            assert!(high <= Duration::from_millis(policy.max_interval_ms));
            for _ in 0..200 {
                let delay = policy.backoff(retry, &mut rng);
                assert!(delay >= low && delay <= high, "{delay:?} not in {low:?}..={high:?}");
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let policy = RetryPolicy::default().jitter(0.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.backoff(3, &mut rng), Duration::from_millis(648));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::default().max_attempts(0).validate().is_err());
        assert!(RetryPolicy::default().multiplier(0.5).validate().is_err());
        assert!(RetryPolicy::default().jitter(1.0).validate().is_err());
        assert!(
            RetryPolicy::default()
                .max_interval(Duration::from_millis(10))
                .validate()
                .is_err()
        );
    }
}
