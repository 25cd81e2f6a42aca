use std::collections::BTreeMap;

use chrono_tz::Tz;

use crate::models::{Submission, UNKNOWN_FORM};
use crate::window::ReportWindow;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBuckets {
    pub days: usize,
    pub by_form: BTreeMap<i64, Vec<u64>>,
    // local date outside the buckets
    pub skipped: usize,
}

impl FormBuckets {
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.days];
        for counts in self.by_form.values() {
            for (total, count) in totals.iter_mut().zip(counts) {
                *total = total.saturating_add(*count);
            }
        }
        totals
    }

    pub fn form(&self, form_id: i64) -> Vec<u64> {
        self.by_form
            .get(&form_id)
            .cloned()
            .unwrap_or_else(|| vec![0; self.days])
    }

    pub fn active_forms(&self) -> Vec<i64> {
        self.by_form
            .keys()
            .copied()
            .filter(|id| *id != UNKNOWN_FORM)
            .collect()
    }
}

pub fn aggregate(submissions: &[Submission], window: &ReportWindow, tz: Tz) -> FormBuckets {
    let days = window.days.len();
    let mut buckets = FormBuckets {
        days,
        ..FormBuckets::default()
    };

    for submission in submissions {
        let local_date = submission.timestamp.with_timezone(&tz).date_naive();
        let Some(index) = window.day_index(local_date) else {
            buckets.skipped += 1;
            continue;
        };
        let counts = buckets
            .by_form
            .entry(submission.form_id)
            .or_insert_with(|| vec![0; days]);
        counts[index] = counts[index].saturating_add(1);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn at(hours_ago: i64, form_id: i64) -> Submission {
        Submission {
            timestamp: now() - Duration::hours(hours_ago),
            form_id,
        }
    }

    #[test]
    fn totals_equal_sum_of_forms() {
        let window = ReportWindow::resolve_at(now(), 7, Tz::UTC);
        let submissions = vec![at(1, 12), at(2, 12), at(30, 7), at(50, 0), at(51, 12)];
        let buckets = aggregate(&submissions, &window, Tz::UTC);

        let totals = buckets.totals();
        assert_eq!(totals.len(), 7);
        for (index, total) in totals.iter().enumerate() {
            let sum: u64 = buckets.by_form.values().map(|counts| counts[index]).sum();
            assert_eq!(*total, sum);
        }
        assert_eq!(totals.iter().sum::<u64>(), 5);
        assert_eq!(buckets.form(12)[6], 2);
        assert_eq!(buckets.form(7)[5], 1);
    }

    #[test]
    fn unknown_form_counts_but_is_not_listed() {
        let window = ReportWindow::resolve_at(now(), 7, Tz::UTC);
        let buckets = aggregate(&[at(1, 0), at(1, 9), at(1, 3)], &window, Tz::UTC);
        assert_eq!(buckets.active_forms(), vec![3, 9]);
        assert_eq!(buckets.totals()[6], 3);
    }

    #[test]
    fn local_date_decides_the_bucket() {
        // 2026-03-10 01:00 UTC is still 2026-03-09 in New York.
        let window = ReportWindow::resolve_at(now(), 7, chrono_tz::America::New_York);
        let submission = Submission {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 10, 1, 0, 0).unwrap(),
            form_id: 4,
        };
        let buckets = aggregate(&[submission], &window, chrono_tz::America::New_York);
        assert_eq!(buckets.form(4), vec![0, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn edge_skew_is_dropped_without_error() {
        let window = ReportWindow::resolve_at(now(), 7, Tz::UTC);
        // Inside the UTC window, before the first local bucket.
        let early = at(7 * 24 - 1, 5);
        let buckets = aggregate(&[early, at(0, 5)], &window, Tz::UTC);
        assert_eq!(buckets.skipped, 1);
        assert_eq!(buckets.totals().iter().sum::<u64>(), 1);
    }

    #[test]
    fn missing_form_yields_zero_series() {
        let window = ReportWindow::resolve_at(now(), 15, Tz::UTC);
        let buckets = aggregate(&[], &window, Tz::UTC);
        assert_eq!(buckets.form(99), vec![0; 15]);
    }
}
