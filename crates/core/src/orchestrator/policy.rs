//! Bounded retry policy.

/// Default number of attempts allowed per stage.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Whether a stage that has already failed `attempts` times may try again.
///
/// A retry is granted while `attempts <= budget - 2`, so a stage gets at most
/// `budget` attempts in total. A budget of 0 or 1 never grants a retry.
pub fn should_retry(attempts: u32, budget: u32) -> bool {
    budget >= 2 && attempts <= budget - 2
}

/// Retry policy with a fixed per-stage budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    budget: u32,
}

impl RetryPolicy {
    pub fn new(budget: u32) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// See [`should_retry`].
    pub fn allows_retry(&self, attempts: u32) -> bool {
        should_retry(attempts, self.budget)
    }

    /// Total attempts a stage can make, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.budget.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_default_budget() {
        for attempts in 0..=3 {
            assert!(should_retry(attempts, 5), "attempt {} should retry", attempts);
        }
        assert!(!should_retry(4, 5));
        assert!(!should_retry(5, 5));
        assert!(!should_retry(u32::MAX, 5));
    }

    #[test]
    fn test_should_retry_matches_bound() {
        for budget in 2..10 {
            for attempts in 0..12 {
                assert_eq!(should_retry(attempts, budget), attempts + 2 <= budget);
            }
        }
    }

    #[test]
    fn test_small_budget_never_retries() {
        for attempts in 0..4 {
            assert!(!should_retry(attempts, 0));
            assert!(!should_retry(attempts, 1));
        }
    }

    #[test]
    fn test_policy_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 5);
        assert_eq!(RetryPolicy::new(1).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }

    #[test]
    fn test_policy_allows_retry() {
        let policy = RetryPolicy::new(2);
        assert!(policy.allows_retry(0));
        assert!(!policy.allows_retry(1));
    }
}
