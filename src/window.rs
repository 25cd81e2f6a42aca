use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

pub const RANGES: [u32; 4] = [7, 15, 28, 90];
pub const DEFAULT_RANGE: u32 = 28;

pub fn parse_range(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|range| RANGES.contains(range))
        .unwrap_or(DEFAULT_RANGE)
}

/// UTC query window plus the local calendar days used as buckets.
///
/// The two are derived independently from the same instant, so rows close
/// to either end of the window may land on a local day that has no bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    pub range: u32,
    pub from_utc: DateTime<Utc>,
    pub to_utc: DateTime<Utc>,
    pub days: Vec<NaiveDate>,
}

impl ReportWindow {
    pub fn resolve_at(now: DateTime<Utc>, range: u32, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let first = today - Duration::days(i64::from(range) - 1);
        let days = (0..range)
            .map(|offset| first + Duration::days(i64::from(offset)))
            .collect();

        Self {
            range,
            from_utc: now - Duration::days(i64::from(range)),
            to_utc: now,
            days,
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.days
            .iter()
            .map(|day| day.format("%Y-%m-%d").to_string())
            .collect()
    }

    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        let first = *self.days.first()?;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        (offset < self.days.len()).then_some(offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from_utc && instant <= self.to_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn range_defaults_to_28_days() {
        assert_eq!(parse_range(None), 28);
        assert_eq!(parse_range(Some("30")), 28);
        assert_eq!(parse_range(Some("abc")), 28);
        assert_eq!(parse_range(Some("-7")), 28);
        assert_eq!(parse_range(Some(" 15 ")), 15);
        for range in RANGES {
            assert_eq!(parse_range(Some(&range.to_string())), range);
        }
    }

    #[test]
    fn labels_are_consecutive_and_end_today() {
        let tz: Tz = "Europe/Rome".parse().unwrap();
        for range in RANGES {
            let window = ReportWindow::resolve_at(noon_utc(), range, tz);
            assert_eq!(window.days.len(), range as usize);
            assert_eq!(
                *window.days.last().unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
            );
            for pair in window.days.windows(2) {
                assert_eq!(pair[1] - pair[0], Duration::days(1));
            }
        }
    }

    #[test]
    fn today_follows_report_timezone() {
        // 23:30 UTC is already the next day in Tokyo.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 23, 30, 0).unwrap();
        let window = ReportWindow::resolve_at(now, 7, chrono_tz::Asia::Tokyo);
        assert_eq!(window.labels().last().unwrap(), "2026-03-11");
        assert_eq!(window.labels().first().unwrap(), "2026-03-05");
    }

    #[test]
    fn utc_window_spans_range_days() {
        let window = ReportWindow::resolve_at(noon_utc(), 15, Tz::UTC);
        assert_eq!(window.to_utc - window.from_utc, Duration::days(15));
        assert!(window.contains(noon_utc() - Duration::days(3)));
        assert!(!window.contains(noon_utc() - Duration::days(16)));
    }

    #[test]
    fn day_index_rejects_dates_outside_buckets() {
        let window = ReportWindow::resolve_at(noon_utc(), 7, Tz::UTC);
        let first = window.days[0];
        assert_eq!(window.day_index(first), Some(0));
        assert_eq!(window.day_index(first + Duration::days(6)), Some(6));
        assert_eq!(window.day_index(first - Duration::days(1)), None);
        assert_eq!(window.day_index(first + Duration::days(7)), None);
    }
}
