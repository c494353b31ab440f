//! Converts calendar-day inputs into an RFC-3339 filter expression using
//! the backend's strict-inequality comparison grammar (spec §4.4, C5).

use chrono::{DateTime, Duration, NaiveDate, Utc};

use chatgate_domain::error::{Error, Result};
use chatgate_domain::search::DateWindow;

/// Formats an instant with microsecond precision, trailing zeros
/// trimmed, and a `Z` suffix — mirrors the original `rfc3339_format`
/// (`original_source/src/google_chat/utils/datetime.py`).
pub fn rfc3339_format(dt: DateTime<Utc>) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let trimmed = match base.find('.') {
        Some(_) => {
            let mut s = base;
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
            s
        }
        None => base,
    };
    format!("{trimmed}Z")
}

fn parse_calendar_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| Error::InvalidDate(format!("{raw}: {e}")))
}

/// Builds the `createTime > "…" [AND createTime < "…"]` filter string
/// for a `DateWindow`. Quoting and strict inequalities are mandatory
/// (spec §4.4, §6 "Date filter wire format").
///
/// Note (deliberate deviation): when only a start date is given, this
/// follows spec.md's literal text and leaves the filter open-ended —
/// `original_source`'s `create_date_filter` instead bounds a bare
/// `start_date` to a 24-hour window via an implicit `next_day`. spec.md
/// is explicit here, so its text wins; see DESIGN.md.
pub fn build_date_filter(window: &DateWindow) -> Result<String> {
    match window {
        DateWindow::Relative { days_window, offset } => {
            if *days_window == 0 {
                return Err(Error::InvalidArgument("days_window must be > 0".into()));
            }
            let today_start = Utc::now()
                .date_naive()
                .and_hms_micro_opt(0, 0, 0, 0)
                .expect("valid midnight")
                .and_utc();
            let end = today_start - Duration::days(i64::from(*offset));
            let start = end - Duration::days(i64::from(*days_window));
            Ok(format!(
                "createTime > \"{}\" AND createTime < \"{}\"",
                rfc3339_format(start),
                rfc3339_format(end)
            ))
        }
        DateWindow::Absolute { start_date, end_date } => {
            let start_day = parse_calendar_day(start_date)?;
            let start = start_day.and_hms_micro_opt(0, 0, 0, 0).expect("valid midnight").and_utc();

            match end_date {
                Some(end_date) => {
                    let end_day = parse_calendar_day(end_date)?;
                    if end_day < start_day {
                        return Err(Error::InvalidDate(format!("end_date {end_date} precedes start_date {start_date}")));
                    }
                    let end = end_day.and_hms_micro_opt(23, 59, 59, 999_999).expect("valid end of day").and_utc();
                    Ok(format!(
                        "createTime > \"{}\" AND createTime < \"{}\"",
                        rfc3339_format(start),
                        rfc3339_format(end)
                    ))
                }
                None => Ok(format!("createTime > \"{}\"", rfc3339_format(start))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_trimmed_trailing_zeros_and_z_suffix() {
        let dt = "2024-05-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(rfc3339_format(dt), "2024-05-01T00:00:00Z");
    }

    #[test]
    fn formats_retains_nonzero_microseconds() {
        let dt = "2024-05-31T23:59:59.999999Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(rfc3339_format(dt), "2024-05-31T23:59:59.999999Z");
    }

    #[test]
    fn scenario_date_filter_formatting() {
        let window = DateWindow::Absolute {
            start_date: "2024-05-01".to_string(),
            end_date: Some("2024-05-31".to_string()),
        };
        let filter = build_date_filter(&window).unwrap();
        assert_eq!(
            filter,
            r#"createTime > "2024-05-01T00:00:00Z" AND createTime < "2024-05-31T23:59:59.999999Z""#
        );
    }

    #[test]
    fn single_start_date_is_open_ended() {
        let window = DateWindow::Absolute {
            start_date: "2024-05-18".to_string(),
            end_date: None,
        };
        let filter = build_date_filter(&window).unwrap();
        assert_eq!(filter, r#"createTime > "2024-05-18T00:00:00Z""#);
        assert!(!filter.contains("AND"));
    }

    #[test]
    fn invalid_calendar_string_is_invalid_date() {
        let window = DateWindow::Absolute {
            start_date: "not-a-date".to_string(),
            end_date: None,
        };
        assert!(matches!(build_date_filter(&window), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn end_before_start_is_invalid_date() {
        let window = DateWindow::Absolute {
            start_date: "2024-05-31".to_string(),
            end_date: Some("2024-05-01".to_string()),
        };
        assert!(matches!(build_date_filter(&window), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn every_generated_filter_has_quoted_timestamps() {
        let window = DateWindow::Relative { days_window: 3, offset: 0 };
        let filter = build_date_filter(&window).unwrap();
        assert!(filter.contains('"'));
        assert!(!filter.contains("Z\" AND createTime < Z"));
    }

    #[test]
    fn relative_window_computes_day_boundaries() {
        let window = DateWindow::Relative { days_window: 3, offset: 1 };
        let filter = build_date_filter(&window).unwrap();
        assert!(filter.starts_with("createTime > \""));
        assert!(filter.contains("T00:00:00"));
    }

    #[test]
    fn zero_days_window_is_invalid_argument() {
        let window = DateWindow::Relative { days_window: 0, offset: 0 };
        assert!(matches!(build_date_filter(&window), Err(Error::InvalidArgument(_))));
    }
}
