//! Cron expression parsing: next-fire computation and minimum-interval
//! derivation, with a fast path for literal/step seconds fields mirroring
//! the original `calculate_min_interval_from_cron`.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

use crate::error::SchedulerError;

/// How many future fires to sample when no fast path applies.
const SAMPLE_SIZE: usize = 100;

fn parse_schedule(cron_expression: &str) -> Result<::cron::Schedule, SchedulerError> {
    ::cron::Schedule::from_str(cron_expression)
        .map_err(|e| SchedulerError::validation(format!("invalid cron expression: {e}")))
}

fn resolve_tz(timezone: &str) -> Result<Tz, SchedulerError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| SchedulerError::validation(format!("unknown timezone: {timezone}")))
}

/// The smallest instant strictly greater than `after` that matches the
/// expression, in the given IANA timezone, truncated to whole seconds.
pub fn next_fire_after(
    cron_expression: &str,
    timezone: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    let schedule = parse_schedule(cron_expression)?;
    let tz = resolve_tz(timezone)?;
    let after_local = after.with_timezone(&tz);

    schedule
        .after(&after_local)
        .next()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| SchedulerError::validation("cron expression never fires again".to_string()))
}

/// Fast path: if the expression is 6-field (second-precision) and its
/// seconds field is a literal integer or a `*/N` step, the interval is
/// known without sampling.
fn seconds_field_fast_path(cron_expression: &str) -> Option<i64> {
    let fields: Vec<&str> = cron_expression.split_whitespace().collect();
    if fields.len() != 6 {
        return None;
    }
    let seconds_field = fields[0];
    if let Some(step) = seconds_field.strip_prefix("*/") {
        return step.parse::<i64>().ok();
    }
    // a bare literal second value N is returned directly, matching the
    // original's `elif seconds_field.isdigit(): return int(seconds_field)`
    seconds_field.parse::<i64>().ok()
}

/// The smallest gap, in seconds, between consecutive fires across the next
/// `SAMPLE_SIZE` occurrences. Returns 0 if fewer than two fires can be
/// produced (a schedule that fires once, or never again).
pub fn min_interval(cron_expression: &str, timezone: &str) -> Result<i64, SchedulerError> {
    if let Some(fast) = seconds_field_fast_path(cron_expression) {
        return Ok(fast);
    }

    let schedule = parse_schedule(cron_expression)?;
    let tz = resolve_tz(timezone)?;
    let start = Utc::now().with_timezone(&tz);

    let fires: Vec<_> = schedule.after(&start).take(SAMPLE_SIZE).collect();
    if fires.len() < 2 {
        return Ok(0);
    }

    let mut min_gap = i64::MAX;
    for pair in fires.windows(2) {
        let gap = (pair[1] - pair[0]).num_seconds();
        if gap < min_gap {
            min_gap = gap;
        }
    }
    Ok(min_gap)
}

/// Seconds between `now` and the schedule's single next fire; used for the
/// degenerate (`min_interval == 0`) validation branch.
pub fn seconds_until_first_fire(
    cron_expression: &str,
    timezone: &str,
) -> Result<i64, SchedulerError> {
    let next = next_fire_after(cron_expression, timezone, Utc::now())?;
    Ok((next - Utc::now()).num_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_detects_step_seconds() {
        assert_eq!(seconds_field_fast_path("*/5 * * * * *"), Some(5));
    }

    #[test]
    fn fast_path_detects_literal_seconds_field() {
        assert_eq!(seconds_field_fast_path("30 * * * * *"), Some(30));
    }

    #[test]
    fn fast_path_none_for_five_field_cron() {
        assert_eq!(seconds_field_fast_path("*/5 * * * *"), None);
    }

    #[test]
    fn min_interval_every_five_minutes() {
        let interval = min_interval("0 */5 * * * *", "UTC").unwrap();
        assert_eq!(interval, 300);
    }

    #[test]
    fn next_fire_after_is_strictly_in_the_future() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = next_fire_after("0 0 * * * *", "UTC", now).unwrap();
        assert!(next > now);
    }
}
