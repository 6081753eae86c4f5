// Trigger Time - when a single-fire job should run

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Trigger time as supplied by the caller
///
/// Either an exact instant or an expiration-time expression. Expressions are
/// resolved once, when the scheduler accepts the job:
/// - RFC 3339 instant: `2026-10-14T12:00:00Z`
/// - ISO-8601 duration relative to acceptance: `PT30S`, `PT1H30M`, `P1DT2H`, `P2W`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerTime {
    Exact { at_ms: i64 },
    Expression { expr: String },
}

impl TriggerTime {
    pub fn at(at_ms: i64) -> Self {
        TriggerTime::Exact { at_ms }
    }

    pub fn at_datetime(at: chrono::DateTime<chrono::Utc>) -> Self {
        TriggerTime::Exact {
            at_ms: at.timestamp_millis(),
        }
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        TriggerTime::Expression { expr: expr.into() }
    }

    /// Resolve to a single instant (epoch ms)
    pub fn resolve(&self, now_millis: i64) -> Result<i64> {
        match self {
            TriggerTime::Exact { at_ms } => Ok(*at_ms),
            TriggerTime::Expression { expr } => resolve_expression(expr.trim(), now_millis),
        }
    }
}

fn resolve_expression(expr: &str, now_millis: i64) -> Result<i64> {
    if expr.is_empty() {
        return Err(DomainError::InvalidTriggerTime("empty expression".to_string()));
    }

    if let Ok(instant) = chrono::DateTime::parse_from_rfc3339(expr) {
        return Ok(instant.timestamp_millis());
    }

    let delay = parse_iso_duration(expr)
        .ok_or_else(|| DomainError::InvalidTriggerTime(expr.to_string()))?;

    now_millis
        .checked_add(delay)
        .ok_or_else(|| DomainError::InvalidTriggerTime(format!("{} overflows", expr)))
}

/// Parse `PnWnDTnHnMnS` into milliseconds (integer components only)
fn parse_iso_duration(expr: &str) -> Option<i64> {
    let body = expr.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut total: i64 = 0;
    let mut components = 0;

    let mut add = |value: i64, unit_ms: i64| -> Option<()> {
        total = total.checked_add(value.checked_mul(unit_ms)?)?;
        components += 1;
        Some(())
    };

    for (value, unit) in components_of(date_part)? {
        match unit {
            'W' => add(value, 7 * MILLIS_PER_DAY)?,
            'D' => add(value, MILLIS_PER_DAY)?,
            _ => return None,
        }
    }

    if let Some(time) = time_part {
        for (value, unit) in components_of(time)? {
            match unit {
                'H' => add(value, MILLIS_PER_HOUR)?,
                'M' => add(value, MILLIS_PER_MINUTE)?,
                'S' => add(value, MILLIS_PER_SECOND)?,
                _ => return None,
            }
        }
    }

    if components == 0 {
        return None;
    }
    Some(total)
}

/// Split `12H30M` into `[(12, 'H'), (30, 'M')]`
fn components_of(part: &str) -> Option<Vec<(i64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}
