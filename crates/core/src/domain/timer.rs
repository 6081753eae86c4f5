// Timer Identifier carried on callbacks

use super::error::DomainError;
use std::fmt;
use std::str::FromStr;

/// Timer id in the form `<prefix>_<timestamp_ms>`
///
/// The prefix is opaque to the receiver and may itself contain underscores;
/// parsing splits at the last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerId {
    prefix: String,
    timestamp_ms: i64,
}

impl TimerId {
    pub fn new(prefix: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            prefix: prefix.into(),
            timestamp_ms,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.timestamp_ms)
    }
}

impl FromStr for TimerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, timestamp) = s
            .rsplit_once('_')
            .ok_or_else(|| DomainError::InvalidTimerId(s.to_string()))?;

        if prefix.is_empty() {
            return Err(DomainError::InvalidTimerId(s.to_string()));
        }

        let timestamp_ms = timestamp
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidTimerId(s.to_string()))?;

        Ok(Self::new(prefix, timestamp_ms))
    }
}
