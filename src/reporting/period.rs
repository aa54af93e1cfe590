//! Report windows derived from a report type and an anchor date

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Half-open date window `[start, end)` covered by one report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub report_type: ReportType,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    /// The window of `report_type` that contains `anchor`
    pub fn containing(
        report_type: ReportType,
        anchor: NaiveDate,
        week_start: Weekday,
    ) -> StationResult<Self> {
        let (start, end) = match report_type {
            ReportType::Daily => (anchor, anchor.succ_opt()),
            ReportType::Weekly => {
                let offset = (7 + anchor.weekday().num_days_from_monday()
                    - week_start.num_days_from_monday())
                    % 7;
                let start = anchor
                    .checked_sub_signed(Duration::days(i64::from(offset)))
                    .ok_or_else(|| out_of_range(anchor))?;
                (start, start.checked_add_signed(Duration::days(7)))
            }
            ReportType::Monthly => {
                let start = first_of_month(anchor.year(), anchor.month())
                    .ok_or_else(|| out_of_range(anchor))?;
                let end = if anchor.month() == 12 {
                    first_of_month(anchor.year() + 1, 1)
                } else {
                    first_of_month(anchor.year(), anchor.month() + 1)
                };
                (start, end)
            }
            ReportType::Yearly => {
                let start =
                    first_of_month(anchor.year(), 1).ok_or_else(|| out_of_range(anchor))?;
                (start, first_of_month(anchor.year() + 1, 1))
            }
        };

        let end = end.ok_or_else(|| out_of_range(anchor))?;
        Ok(Self {
            report_type,
            start,
            end,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Number of days in the window
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn out_of_range(anchor: NaiveDate) -> StationError {
    StationError::Validation(format!("Report date {} is out of range", anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_window() {
        let period = ReportPeriod::containing(ReportType::Daily, date(2024, 2, 29), Weekday::Mon)
            .unwrap();
        assert_eq!(period.start, date(2024, 2, 29));
        assert_eq!(period.end, date(2024, 3, 1));
        assert_eq!(period.days(), 1);
    }

    #[test]
    fn test_weekly_window_respects_week_start() {
        // 2024-03-06 is a Wednesday
        let monday = ReportPeriod::containing(ReportType::Weekly, date(2024, 3, 6), Weekday::Mon)
            .unwrap();
        assert_eq!(monday.start, date(2024, 3, 4));
        assert_eq!(monday.end, date(2024, 3, 11));

        let sunday = ReportPeriod::containing(ReportType::Weekly, date(2024, 3, 6), Weekday::Sun)
            .unwrap();
        assert_eq!(sunday.start, date(2024, 3, 3));

        let on_start =
            ReportPeriod::containing(ReportType::Weekly, date(2024, 3, 4), Weekday::Mon).unwrap();
        assert_eq!(on_start.start, date(2024, 3, 4));
    }

    #[test]
    fn test_monthly_window_crosses_year() {
        let period =
            ReportPeriod::containing(ReportType::Monthly, date(2023, 12, 15), Weekday::Mon)
                .unwrap();
        assert_eq!(period.start, date(2023, 12, 1));
        assert_eq!(period.end, date(2024, 1, 1));
        assert!(period.contains(date(2023, 12, 31)));
        assert!(!period.contains(date(2024, 1, 1)));
    }

    #[test]
    fn test_yearly_window() {
        let period =
            ReportPeriod::containing(ReportType::Yearly, date(2024, 7, 4), Weekday::Mon).unwrap();
        assert_eq!(period.start, date(2024, 1, 1));
        assert_eq!(period.days(), 366);
    }
}
