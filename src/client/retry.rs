//! Retry and backoff rules for the data client

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after HTTP 429 before giving up
    pub max_rate_limit_retries: u32,
    /// Wait after a 429 that carries no usable `Retry-After`
    pub rate_limit_delay: Duration,
    /// Upper bound on an advertised `Retry-After`
    pub max_retry_after: Duration,
    /// Retries after a 5xx or transport failure
    pub max_failure_retries: u32,
    pub failure_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 3,
            rate_limit_delay: Duration::from_secs(2),
            max_retry_after: Duration::from_secs(120),
            max_failure_retries: 1,
            failure_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to honour after a 429, given the raw `Retry-After` header
    pub fn rate_limit_delay_for(&self, retry_after: Option<&str>) -> Duration {
        retry_after
            .and_then(parse_retry_after)
            .map_or(self.rate_limit_delay, |delay| delay.min(self.max_retry_after))
    }
}

/// Parse a `Retry-After` value: delta-seconds (integer or decimal) or an
/// HTTP-date. Dates in the past mean "now".
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delta_seconds() {
        assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_retry_after("-2"), None);
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after("NaN"), None);
        assert_eq!(parse_retry_after("inf"), None);
        assert_eq!(parse_retry_after("1e300"), None);
    }

    #[test]
    fn parses_http_dates() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );

        let future = (Utc::now() + chrono::Duration::seconds(30)).to_rfc2822();
        let delay = parse_retry_after(&future).expect("valid date");
        assert!(delay > Duration::from_secs(25) && delay <= Duration::from_secs(30));
    }

    #[test]
    fn policy_falls_back_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.rate_limit_delay_for(None), Duration::from_secs(2));
        assert_eq!(policy.rate_limit_delay_for(Some("bogus")), Duration::from_secs(2));
        assert_eq!(policy.rate_limit_delay_for(Some("7")), Duration::from_secs(7));
        assert_eq!(
            policy.rate_limit_delay_for(Some("86400")),
            Duration::from_secs(120)
        );
    }
}
