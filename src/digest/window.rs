//! Report window: "yesterday H:00 to today H:00" in the report time zone.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};

/// Half-open interval `[start, end)` covered by one report. Always 24 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Compute the most recent complete window ending at `boundary_hour:00` local time.
///
/// If today's boundary has not been reached yet, the window ends at
/// yesterday's boundary.
pub fn compute_window<Tz: TimeZone>(now: &DateTime<Tz>, boundary_hour: u32) -> TimeWindow {
    let mut day = now.date_naive();
    if now.hour() < boundary_hour {
        day = day.pred_opt().unwrap_or(day);
    }
    let boundary = NaiveTime::from_hms_opt(boundary_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let end = resolve_local(&now.timezone(), day.and_time(boundary)).with_timezone(&Utc);
    TimeWindow {
        start: end - Duration::hours(24),
        end,
    }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        // Skipped by a DST jump: the boundary lands on the first hour after the gap.
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}
