//! Whole-day date ranges in local time.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// Closed local-time range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl DateRange {
    /// `00:00:00` to `23:59:59` of `day`. `None` if local midnight does not
    /// exist on that day.
    #[must_use]
    pub fn whole_day(day: NaiveDate) -> Option<Self> {
        let start = Local
            .from_local_datetime(&day.and_hms_opt(0, 0, 0)?)
            .earliest()?;
        let next = Local
            .from_local_datetime(&day.succ_opt()?.and_hms_opt(0, 0, 0)?)
            .earliest()?;

        Some(Self {
            start,
            end: next - Duration::seconds(1),
        })
    }

    /// The whole day `days` days before `now`.
    #[must_use]
    pub fn days_ago(now: DateTime<Local>, days: u32) -> Option<Self> {
        let day = now
            .date_naive()
            .checked_sub_days(chrono::Days::new(u64::from(days)))?;
        Self::whole_day(day)
    }

    /// The day before `now`.
    #[must_use]
    pub fn previous_day(now: DateTime<Local>) -> Option<Self> {
        Self::days_ago(now, 1)
    }

    #[must_use]
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    #[must_use]
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}
