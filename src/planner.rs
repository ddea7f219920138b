//! Work partitioning: time windows and the task cross product.

use crate::models::{Task, Window};
use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, instrument};

/// Split `[start, end)` into contiguous windows of at most `delta`.
///
/// The last window is clipped to `end`. Returns an empty list when
/// `start >= end` or `delta` is not positive.
pub fn plan_windows(start: NaiveDateTime, end: NaiveDateTime, delta: TimeDelta) -> Vec<Window> {
    if start >= end || delta <= TimeDelta::zero() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut current = start;
    while current < end {
        let next = match current.checked_add_signed(delta) {
            Some(t) if t < end => t,
            _ => end,
        };
        windows.push(Window {
            start: current,
            end: next,
        });
        current = next;
    }
    windows
}

/// Query parameters every task of a run shares.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub base_query: String,
    pub theme: Option<String>,
    pub tone: Option<String>,
}

/// One task per `(country, window)`, country-major.
#[instrument(
    level = "info",
    skip_all,
    fields(countries = countries.len(), windows = windows.len())
)]
pub fn build_tasks(countries: &[String], windows: &[Window], query: &QuerySpec) -> Vec<Task> {
    let tasks: Vec<Task> = countries
        .iter()
        .flat_map(|country| {
            windows.iter().map(move |window| Task {
                country: country.clone(),
                window: *window,
                base_query: query.base_query.clone(),
                theme: query.theme.clone(),
                tone: query.tone.clone(),
            })
        })
        .collect();
    debug!(count = tasks.len(), "Built tasks");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_plan_exact_week() {
        let windows = plan_windows(day(2018, 1, 1), day(2018, 1, 8), TimeDelta::weeks(1));
        assert_eq!(
            windows,
            vec![Window {
                start: day(2018, 1, 1),
                end: day(2018, 1, 8)
            }]
        );
    }

    #[test]
    fn test_plan_clips_final_window() {
        let windows = plan_windows(day(2018, 1, 1), day(2018, 1, 10), TimeDelta::weeks(1));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].end, day(2018, 1, 8));
        assert_eq!(windows[1].start, day(2018, 1, 8));
        assert_eq!(windows[1].end, day(2018, 1, 10));
    }

    #[test]
    fn test_plan_windows_are_contiguous() {
        let start = day(2017, 1, 1);
        let end = day(2017, 1, 2);
        let windows = plan_windows(start, end, TimeDelta::hours(1));
        assert_eq!(windows.len(), 24);
        assert_eq!(windows.first().unwrap().start, start);
        assert_eq!(windows.last().unwrap().end, end);
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[0].end);
        }
    }

    #[test]
    fn test_plan_empty_range() {
        assert!(plan_windows(day(2018, 1, 1), day(2018, 1, 1), TimeDelta::days(1)).is_empty());
        assert!(plan_windows(day(2018, 1, 2), day(2018, 1, 1), TimeDelta::days(1)).is_empty());
    }

    #[test]
    fn test_plan_non_positive_delta() {
        assert!(plan_windows(day(2018, 1, 1), day(2018, 1, 2), TimeDelta::zero()).is_empty());
    }

    #[test]
    fn test_build_tasks_cross_product() {
        let windows = plan_windows(day(2018, 1, 1), day(2018, 1, 4), TimeDelta::days(1));
        let countries = vec!["US".to_string(), "UK".to_string()];
        let query = QuerySpec {
            base_query: "immigration".to_string(),
            theme: Some("IMMIGRATION".to_string()),
            tone: None,
        };
        let tasks = build_tasks(&countries, &windows, &query);

        assert_eq!(tasks.len(), 6);
        assert!(tasks[..3].iter().all(|t| t.country == "US"));
        assert!(tasks[3..].iter().all(|t| t.country == "UK"));
        assert_eq!(tasks[1].window, windows[1]);
        assert!(tasks.iter().all(|t| t.base_query == "immigration"));
        assert!(tasks.iter().all(|t| t.theme.as_deref() == Some("IMMIGRATION")));
    }
}
