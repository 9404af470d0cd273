use std::time::Duration;

use http::StatusCode;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(1000);

/// Retry configuration for the fetch engine.
///
/// Backoff is linear in the attempt number: the first retry waits one base
/// period, the second waits two, and so on. The growth is deterministic so the
/// exact sleep sequence can be asserted in tests.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    pub fn standard() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    /// Single attempt, no retries.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    /// Total attempt budget. `0` behaves the same as `1`: one attempt, no
    /// retries.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff.max(Duration::from_millis(1));
        self
    }

    pub(crate) fn max_attempts_value(&self) -> u32 {
        self.max_attempts
    }

    pub(crate) fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt)
    }

    /// Anything outside `[200, 400)` is eligible for retry. Redirects count as
    /// success here: following them is the caller's concern, and re-issuing
    /// the identical request would just reproduce the redirect.
    pub(crate) fn is_retryable_status(&self, status: StatusCode) -> bool {
        let code = status.as_u16();
        code < 200 || code >= 400
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use http::StatusCode;
    use std::time::Duration;

    #[test]
    fn backoff_grows_linearly_with_attempt_number() {
        let policy = RetryPolicy::standard().base_backoff(Duration::from_millis(1000));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_millis(3000));
    }

    #[test]
    fn success_and_redirect_statuses_are_not_retryable() {
        let policy = RetryPolicy::standard();
        assert!(!policy.is_retryable_status(StatusCode::OK));
        assert!(!policy.is_retryable_status(StatusCode::NO_CONTENT));
        assert!(!policy.is_retryable_status(StatusCode::MOVED_PERMANENTLY));
        assert!(!policy.is_retryable_status(StatusCode::TEMPORARY_REDIRECT));
    }

    #[test]
    fn informational_client_and_server_failures_are_retryable() {
        let policy = RetryPolicy::standard();
        assert!(policy.is_retryable_status(StatusCode::CONTINUE));
        assert!(policy.is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(policy.is_retryable_status(StatusCode::FORBIDDEN));
        assert!(policy.is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(policy.is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn base_backoff_is_clamped_to_at_least_one_millisecond() {
        let policy = RetryPolicy::standard().base_backoff(Duration::ZERO);
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(1));
    }
}
