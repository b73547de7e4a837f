use std::time::Duration;

/// Bounded-retry policy passed explicitly into fetch calls
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_secs: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff: Duration::from_secs(backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, 1);
        assert_eq!(policy.attempts, 1);
    }
}
