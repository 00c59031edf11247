//! # Trends
//!
//! Period-over-period response counts for the dashboard charts.
//!
//! ## Windows
//! - Month view: current period is the anchor's calendar month, bucketed by day of month.
//!   Previous period is the whole prior month.
//! - Year view: current period is Jan 1 - Dec 31 of the anchor's year, bucketed by month.
//!   Previous period is the prior year.
//!
//! ## Chart
//! Every bucket of the current period is emitted in ascending order, empty ones included,
//! so the chart series has no gaps.
//!
//! ## Growth
//! - both periods empty: `0`
//! - previous empty, current not: `current * 100`, i.e. growth from zero reported as a raw count scaled by 100
//! - otherwise `(current - previous) / previous * 100`, one decimal
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::InsightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Day buckets over one month.
    Day,
    /// Month buckets over one year.
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub previous_start: NaiveDate,
    pub previous_end: NaiveDate,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
    pub full_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub current_period_count: u64,
    pub previous_period_count: u64,
    pub buckets: Vec<ChartPoint>,
    pub growth_pct: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DayComparison {
    pub today_count: u64,
    pub yesterday_count: u64,
    pub diff: i64,
    pub growth_pct: f64,
}

fn invalid(detail: impl Into<String>) -> InsightError {
    InsightError::InvalidWindow(detail.into())
}

impl Window {
    pub fn month(year: i32, month: u32) -> Result<Self, InsightError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| invalid(format!("{year}-{month}")))?;

        let next_start = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| invalid(format!("{year}-{month}")))?;

        let end = next_start - Duration::days(1);
        let previous_end = start - Duration::days(1);
        let previous_start = previous_end
            .with_day(1)
            .ok_or_else(|| invalid(format!("{year}-{month}")))?;

        Ok(Self {
            granularity: Granularity::Day,
            start,
            end,
            previous_start,
            previous_end,
        })
    }

    pub fn year(year: i32) -> Result<Self, InsightError> {
        let bounds = |y: i32| {
            NaiveDate::from_ymd_opt(y, 1, 1)
                .zip(NaiveDate::from_ymd_opt(y, 12, 31))
                .ok_or_else(|| invalid(year.to_string()))
        };

        let (start, end) = bounds(year)?;
        let (previous_start, previous_end) = bounds(year - 1)?;

        Ok(Self {
            granularity: Granularity::Month,
            start,
            end,
            previous_start,
            previous_end,
        })
    }

    /// `view_mode` is `month` or `year`; `target` is `YYYY-MM` or `YYYY`, defaulting to `today`.
    pub fn parse(
        view_mode: &str,
        target: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, InsightError> {
        let target = target.map(str::trim).filter(|t| !t.is_empty());

        match view_mode {
            "month" => match target {
                None => Self::month(today.year(), today.month()),
                Some(target) => {
                    let (year, month) = target
                        .split_once('-')
                        .ok_or_else(|| invalid(target))?;
                    let year = year.parse().map_err(|_| invalid(target))?;
                    let month = month.parse().map_err(|_| invalid(target))?;

                    Self::month(year, month)
                }
            },
            "year" => match target {
                None => Self::year(today.year()),
                Some(target) => {
                    let year = target.split('-').next().unwrap_or(target);
                    Self::year(year.parse().map_err(|_| invalid(target))?)
                }
            },
            other => Err(invalid(format!("unknown view mode {other:?}"))),
        }
    }

    fn bucket_of(&self, date: NaiveDate) -> u32 {
        match self.granularity {
            Granularity::Day => date.day(),
            Granularity::Month => date.month(),
        }
    }

    fn bucket_count(&self) -> u32 {
        match self.granularity {
            Granularity::Day => self.end.day(),
            Granularity::Month => 12,
        }
    }

    fn full_date(&self, bucket: u32) -> Option<String> {
        match self.granularity {
            Granularity::Day => self
                .start
                .with_day(bucket)
                .map(|date| date.format("%Y-%m-%d").to_string()),
            Granularity::Month => Some(format!("{}-{bucket:02}", self.start.year())),
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn contains_previous(&self, date: NaiveDate) -> bool {
        self.previous_start <= date && date <= self.previous_end
    }
}

pub fn growth_pct(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        return if current == 0 {
            0.0
        } else {
            current as f64 * 100.0
        };
    }

    let change = (current as f64 - previous as f64) / previous as f64 * 100.0;
    // one decimal, ties to even
    (change * 10.0).round_ties_even() / 10.0
}

pub fn aggregate<I>(timestamps: I, window: &Window) -> TrendReport
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let mut counts = vec![0u64; window.bucket_count() as usize];
    let mut current_period_count = 0;
    let mut previous_period_count = 0;

    for timestamp in timestamps {
        let date = timestamp.date();

        if window.contains(date) {
            current_period_count += 1;
            counts[(window.bucket_of(date) - 1) as usize] += 1;
        } else if window.contains_previous(date) {
            previous_period_count += 1;
        }
    }

    let buckets = counts
        .into_iter()
        .zip(1u32..)
        .map(|(value, bucket)| ChartPoint {
            label: bucket.to_string(),
            value,
            full_date: window.full_date(bucket),
        })
        .collect();

    TrendReport {
        current_period_count,
        previous_period_count,
        buckets,
        growth_pct: growth_pct(current_period_count, previous_period_count),
    }
}

pub fn compare_days<I>(timestamps: I, today: NaiveDate) -> DayComparison
where
    I: IntoIterator<Item = NaiveDateTime>,
{
    let yesterday = today - Duration::days(1);
    let mut today_count = 0;
    let mut yesterday_count = 0;

    for timestamp in timestamps {
        let date = timestamp.date();

        if date == today {
            today_count += 1;
        } else if date == yesterday {
            yesterday_count += 1;
        }
    }

    DayComparison {
        today_count,
        yesterday_count,
        diff: today_count as i64 - yesterday_count as i64,
        growth_pct: growth_pct(today_count, yesterday_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(12, 30, 0).unwrap()
    }

    #[test]
    fn test_growth_formula() {
        assert_eq!(growth_pct(5, 0), 500.0);
        assert_eq!(growth_pct(0, 0), 0.0);
        assert_eq!(growth_pct(8, 4), 100.0);
        assert_eq!(growth_pct(3, 4), -25.0);
        assert_eq!(growth_pct(1, 3), -66.7);
        assert_eq!(growth_pct(0, 7), -100.0);

        // exact halves go to the even neighbour
        assert_eq!(growth_pct(17, 16), 6.2);
        assert_eq!(growth_pct(19, 16), 18.8);
        assert_eq!(growth_pct(401, 400), 0.2);
    }

    #[test]
    fn test_month_window_bounds() {
        let window = Window::month(2025, 3).unwrap();
        assert_eq!(window.start, date(2025, 3, 1));
        assert_eq!(window.end, date(2025, 3, 31));
        assert_eq!(window.previous_start, date(2025, 2, 1));
        assert_eq!(window.previous_end, date(2025, 2, 28));

        let january = Window::month(2024, 1).unwrap();
        assert_eq!(january.previous_start, date(2023, 12, 1));
        assert_eq!(january.previous_end, date(2023, 12, 31));

        let december = Window::month(2024, 12).unwrap();
        assert_eq!(december.end, date(2024, 12, 31));

        let leap = Window::month(2024, 2).unwrap();
        assert_eq!(leap.end, date(2024, 2, 29));
    }

    #[test]
    fn test_year_window_bounds() {
        let window = Window::year(2025).unwrap();
        assert_eq!(window.start, date(2025, 1, 1));
        assert_eq!(window.end, date(2025, 12, 31));
        assert_eq!(window.previous_start, date(2024, 1, 1));
        assert_eq!(window.previous_end, date(2024, 12, 31));
    }

    #[test]
    fn test_parse_window() {
        let today = date(2025, 6, 15);

        assert_eq!(
            Window::parse("month", None, today).unwrap(),
            Window::month(2025, 6).unwrap()
        );
        assert_eq!(
            Window::parse("month", Some("2024-02"), today).unwrap(),
            Window::month(2024, 2).unwrap()
        );
        assert_eq!(
            Window::parse("year", Some("2023"), today).unwrap(),
            Window::year(2023).unwrap()
        );
        assert_eq!(
            Window::parse("year", None, today).unwrap(),
            Window::year(2025).unwrap()
        );
        assert_eq!(
            Window::parse("month", Some(""), today).unwrap(),
            Window::month(2025, 6).unwrap()
        );

        assert!(Window::parse("week", None, today).is_err());
        assert!(Window::parse("month", Some("2024"), today).is_err());
        assert!(Window::parse("month", Some("2024-13"), today).is_err());
        assert!(Window::parse("year", Some("soon"), today).is_err());
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let report = aggregate(Vec::new(), &Window::month(2025, 4).unwrap());

        assert_eq!(report.current_period_count, 0);
        assert_eq!(report.previous_period_count, 0);
        assert_eq!(report.growth_pct, 0.0);
        assert_eq!(report.buckets.len(), 30);
        assert!(report.buckets.iter().all(|point| point.value == 0));
    }

    #[test]
    fn test_thirty_day_month_buckets() {
        let report = aggregate(Vec::new(), &Window::month(2025, 9).unwrap());

        let labels: Vec<_> = report.buckets.iter().map(|p| p.label.clone()).collect();
        let expected: Vec<_> = (1..=30).map(|d: u32| d.to_string()).collect();
        assert_eq!(labels, expected);

        assert_eq!(report.buckets[0].full_date.as_deref(), Some("2025-09-01"));
        assert_eq!(report.buckets[29].full_date.as_deref(), Some("2025-09-30"));
    }

    #[test]
    fn test_offset_timestamps_bucket_by_written_date() {
        let raw = [
            "2025-03-31T20:00:00+00:00".to_string(),
            "2025-04-01T01:00:00+08:00".to_string(),
        ];

        let report = aggregate(
            crate::utils::parse_timestamps(&raw),
            &Window::month(2025, 3).unwrap(),
        );

        assert_eq!(report.current_period_count, 1);
        assert_eq!(report.buckets[30].value, 1);
    }

    #[test]
    fn test_month_aggregation() {
        let timestamps = vec![
            at(2025, 3, 1),
            at(2025, 3, 1),
            at(2025, 3, 17),
            at(2025, 3, 31),
            at(2025, 2, 10),
            at(2025, 2, 28),
            at(2025, 1, 31),
            at(2025, 4, 1),
        ];

        let report = aggregate(timestamps, &Window::month(2025, 3).unwrap());

        assert_eq!(report.current_period_count, 4);
        assert_eq!(report.previous_period_count, 2);
        assert_eq!(report.growth_pct, 100.0);
        assert_eq!(report.buckets.len(), 31);
        assert_eq!(report.buckets[0].value, 2);
        assert_eq!(report.buckets[16].value, 1);
        assert_eq!(report.buckets[30].value, 1);
        assert_eq!(report.buckets.iter().map(|p| p.value).sum::<u64>(), 4);
    }

    #[test]
    fn test_year_aggregation() {
        let timestamps = vec![
            at(2024, 1, 5),
            at(2024, 1, 20),
            at(2024, 12, 31),
            at(2023, 6, 1),
            at(2022, 6, 1),
        ];

        let report = aggregate(timestamps, &Window::year(2024).unwrap());

        assert_eq!(report.current_period_count, 3);
        assert_eq!(report.previous_period_count, 1);
        assert_eq!(report.growth_pct, 200.0);
        assert_eq!(report.buckets.len(), 12);
        assert_eq!(report.buckets[0].value, 2);
        assert_eq!(report.buckets[11].value, 1);
        assert_eq!(report.buckets[0].label, "1");
        assert_eq!(report.buckets[11].full_date.as_deref(), Some("2024-12"));
    }

    #[test]
    fn test_growth_from_empty_previous_period() {
        let timestamps = vec![at(2025, 5, 2); 5];
        let report = aggregate(timestamps, &Window::month(2025, 5).unwrap());

        assert_eq!(report.previous_period_count, 0);
        assert_eq!(report.growth_pct, 500.0);
    }

    #[test]
    fn test_compare_days() {
        let today = date(2025, 3, 1);
        let timestamps = vec![
            at(2025, 3, 1),
            at(2025, 3, 1),
            at(2025, 3, 1),
            at(2025, 2, 28),
            at(2025, 2, 28),
            at(2025, 2, 28),
            at(2025, 2, 28),
            at(2025, 2, 27),
        ];

        let comparison = compare_days(timestamps, today);

        assert_eq!(comparison.today_count, 3);
        assert_eq!(comparison.yesterday_count, 4);
        assert_eq!(comparison.diff, -1);
        assert_eq!(comparison.growth_pct, -25.0);
    }
}
