use chrono::TimeDelta;

use hourglass_core::{AppError, AppResult, NonEmptyString};

/// Fixed-window quota applied to one scope.
///
/// The scope namespaces the counter keys, so two rules with different scopes
/// never share counters even for the same identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRule {
    scope: NonEmptyString,
    max_requests: u32,
    window: TimeDelta,
}

impl RateLimitRule {
    /// Creates a rule allowing `max_requests` per `window_ms` milliseconds.
    ///
    /// A `max_requests` of zero is valid and denies every request.
    pub fn new(scope: impl Into<String>, max_requests: u32, window_ms: u64) -> AppResult<Self> {
        let scope = NonEmptyString::new(scope)
            .map_err(|_| AppError::Validation("rate limit scope must not be empty".to_owned()))?;

        if window_ms == 0 {
            return Err(AppError::Validation(format!(
                "rate limit window for '{scope}' must be greater than zero"
            )));
        }

        let window_ms = i64::try_from(window_ms).map_err(|error| {
            AppError::Validation(format!("invalid rate limit window for '{scope}': {error}"))
        })?;
        let window = TimeDelta::try_milliseconds(window_ms).ok_or_else(|| {
            AppError::Validation(format!("rate limit window for '{scope}' is out of range"))
        })?;

        Ok(Self {
            scope,
            max_requests,
            window,
        })
    }

    /// Returns the scope name.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.scope.as_str()
    }

    /// Returns the maximum number of requests per window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Returns the window length.
    #[must_use]
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Returns the namespaced counter key for an identifier.
    #[must_use]
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{identifier}", self.scope)
    }
}
