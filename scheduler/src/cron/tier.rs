//! Tier floor enforcement for cron cadence.
//!
//! Constants and message wording are grounded on the original
//! `cron_validator.py`: free tier requires a 300s floor, pro tier a 5s
//! floor, and a schedule is rejected either because its steady-state
//! minimum interval is too small, or — in the degenerate "fires once"
//! case — because that single fire would land sooner than the floor
//! allows.

pub use crate::domain::Tier;

pub const FREE_TIER_MIN_INTERVAL_SECS: i64 = 300;
pub const PRO_TIER_MIN_INTERVAL_SECS: i64 = 5;

pub fn floor_for(tier: Tier) -> i64 {
    match tier {
        Tier::Free => FREE_TIER_MIN_INTERVAL_SECS,
        Tier::Pro => PRO_TIER_MIN_INTERVAL_SECS,
    }
}

fn format_interval(seconds: i64) -> String {
    if seconds >= 60 && seconds % 60 == 0 {
        let minutes = seconds / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    } else if seconds == 1 {
        "1 second".to_string()
    } else {
        format!("{seconds} seconds")
    }
}

/// Validate a schedule's cadence against its tier's floor.
///
/// `min_interval_secs` is the steady-state minimum gap between fires (0 for
/// a schedule that only ever fires once). `seconds_until_first_fire` is only
/// consulted in the degenerate zero case.
pub fn validate_cron_interval(
    tier: Tier,
    min_interval_secs: i64,
    seconds_until_first_fire: i64,
) -> Result<(), String> {
    let floor = floor_for(tier);
    let tier_name = match tier {
        Tier::Free => "free",
        Tier::Pro => "pro",
    };

    if min_interval_secs == 0 {
        if seconds_until_first_fire < floor {
            return Err(format!(
                "Schedule interval too frequent for {tier_name} tier. Minimum interval is {}. \
                 Your first execution would be in {seconds_until_first_fire} seconds.",
                format_interval(floor)
            ));
        }
        return Ok(());
    }

    if min_interval_secs < floor {
        return Err(format!(
            "Schedule interval too frequent for {tier_name} tier. Minimum interval is {}. \
             Your schedule has a minimum interval of {min_interval_secs} seconds.",
            format_interval(floor)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_rejects_minutely_schedule() {
        let err = validate_cron_interval(Tier::Free, 60, 60).unwrap_err();
        assert!(err.contains("5 minutes"));
        assert!(err.contains("free"));
    }

    #[test]
    fn free_tier_accepts_five_minute_schedule() {
        assert!(validate_cron_interval(Tier::Free, 300, 300).is_ok());
    }

    #[test]
    fn pro_tier_accepts_five_second_schedule() {
        assert!(validate_cron_interval(Tier::Pro, 5, 5).is_ok());
    }

    #[test]
    fn pro_tier_rejects_one_second_schedule() {
        let err = validate_cron_interval(Tier::Pro, 1, 1).unwrap_err();
        assert!(err.contains("5 seconds"));
    }

    #[test]
    fn degenerate_schedule_checks_first_fire_only() {
        assert!(validate_cron_interval(Tier::Free, 0, 3600).is_ok());
        let err = validate_cron_interval(Tier::Free, 0, 10).unwrap_err();
        assert!(err.contains("first execution would be in 10 seconds"));
    }
}
