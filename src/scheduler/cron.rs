//! Cron expression handling for the daily trigger.

use chrono::{DateTime, TimeZone, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Normalize a cron expression to the 6/7-field format the `cron` crate expects.
/// Standard 5-field (min hour dom month dow) gets "0 " prepended for seconds.
pub fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", expr.trim())
    } else {
        expr.trim().to_string()
    }
}

pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalize_cron(expr))
}

/// First fire time strictly after `after`, evaluated in `after`'s time zone.
pub fn next_fire<Tz: TimeZone>(schedule: &Schedule, after: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    schedule
        .after(after)
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn test_normalize_cron() {
        assert_eq!(normalize_cron("0 22 * * *"), "0 0 22 * * *");
        assert_eq!(normalize_cron("0 0 22 * * *"), "0 0 22 * * *");
        assert_eq!(normalize_cron(" 0 22 * * * "), "0 0 22 * * *");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_schedule("every day at ten").is_err());
        assert!(parse_schedule("0 22 * * *").is_ok());
    }

    #[test]
    fn test_next_fire_in_zone() {
        let schedule = parse_schedule("0 22 * * *").unwrap();

        let before = Tokyo.with_ymd_and_hms(2024, 5, 1, 21, 0, 0).unwrap();
        let next = next_fire(&schedule, &before).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap());

        // Exactly at the fire time moves to the next day.
        let at = Tokyo.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();
        let next = next_fire(&schedule, &at).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 13, 0, 0).unwrap());
    }
}
