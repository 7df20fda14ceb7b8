use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{SalonSettings, WeeklyScheduleRow};

/// Opening hours used when stored time strings are missing or unparseable.
pub const FALLBACK_OPEN_MIN: u32 = 9 * 60;
pub const FALLBACK_CLOSE_MIN: u32 = 20 * 60;

/// The effective working interval for one staff member on one day,
/// in minutes from midnight, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start_min: u32,
    pub end_min: u32,
}

/// Parse "HH:MM" into minutes from midnight.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Parse the stored "HH:MM - HH:MM" salon hours format.
pub fn parse_hours_range(s: &str) -> Option<(u32, u32)> {
    let (a, b) = s.split_once('-')?;
    let start = parse_hhmm(a)?;
    let end = parse_hhmm(b)?;
    (start < end).then_some((start, end))
}

/// 0–6 counted from Monday, matching weekly_schedule.day_of_week.
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Resolve the working interval for a staff member on `date`.
///
/// A weekly-template row for that weekday wins: inactive means the staff
/// member does not work that day at all, active uses the row's times. With
/// no row, the salon-wide weekday/weekend default applies. Unparseable
/// times fall back to the hard-coded opening hours rather than erroring.
pub fn resolve_shift(
    date: NaiveDate,
    entry: Option<&WeeklyScheduleRow>,
    settings: &SalonSettings,
) -> Option<ShiftWindow> {
    if let Some(row) = entry {
        if !row.is_active {
            return None;
        }
        return Some(
            match (parse_hhmm(&row.start_time), parse_hhmm(&row.end_time)) {
                (Some(start), Some(end)) if start < end => ShiftWindow {
                    start_min: start,
                    end_min: end,
                },
                _ => {
                    tracing::warn!(
                        staff_id = row.staff_id,
                        day_of_week = row.day_of_week,
                        "unparseable schedule entry times, using fallback hours"
                    );
                    ShiftWindow {
                        start_min: FALLBACK_OPEN_MIN,
                        end_min: FALLBACK_CLOSE_MIN,
                    }
                }
            },
        );
    }

    let raw = if is_weekend(date) {
        &settings.weekend_hours
    } else {
        &settings.weekday_hours
    };
    Some(match parse_hours_range(raw) {
        Some((start, end)) => ShiftWindow {
            start_min: start,
            end_min: end,
        },
        None => {
            tracing::warn!(hours = %raw, "unparseable salon default hours, using fallback");
            ShiftWindow {
                start_min: FALLBACK_OPEN_MIN,
                end_min: FALLBACK_CLOSE_MIN,
            }
        }
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: i64, start: &str, end: &str, active: bool) -> WeeklyScheduleRow {
        WeeklyScheduleRow {
            id: 1,
            staff_id: 7,
            day_of_week: day,
            start_time: start.into(),
            end_time: end.into(),
            is_active: active,
        }
    }

    // 2025-06-09 is a Monday, 2025-06-14 a Saturday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
    }

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    #[test]
    fn parse_hhmm_basic() {
        assert_eq!(parse_hhmm("10:30"), Some(630));
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("23:59"), Some(1439));
    }

    #[test]
    fn parse_hhmm_rejects_garbage() {
        assert_eq!(parse_hhmm(""), None);
        assert_eq!(parse_hhmm("25:00"), None);
        assert_eq!(parse_hhmm("10:61"), None);
        assert_eq!(parse_hhmm("ten"), None);
        assert_eq!(parse_hhmm("10-30"), None);
    }

    #[test]
    fn parse_hhmm_trims_whitespace() {
        assert_eq!(parse_hhmm(" 09:00 "), Some(540));
    }

    #[test]
    fn format_hhmm_roundtrip() {
        assert_eq!(format_hhmm(630), "10:30");
        assert_eq!(format_hhmm(0), "00:00");
        assert_eq!(parse_hhmm(&format_hhmm(1259)), Some(1259));
    }

    #[test]
    fn parse_hours_range_basic() {
        assert_eq!(parse_hours_range("09:00 - 20:00"), Some((540, 1200)));
        assert_eq!(parse_hours_range("10:30-18:00"), Some((630, 1080)));
    }

    #[test]
    fn parse_hours_range_rejects_inverted_and_garbage() {
        assert_eq!(parse_hours_range("20:00 - 09:00"), None);
        assert_eq!(parse_hours_range("09:00"), None);
        assert_eq!(parse_hours_range(""), None);
    }

    #[test]
    fn day_of_week_monday_based() {
        assert_eq!(day_of_week(monday()), 0);
        assert_eq!(day_of_week(saturday()), 5);
    }

    #[test]
    fn active_entry_wins_over_defaults() {
        let row = entry(0, "11:00", "19:00", true);
        let shift = resolve_shift(monday(), Some(&row), &SalonSettings::default()).unwrap();
        assert_eq!(shift.start_min, 660);
        assert_eq!(shift.end_min, 1140);
    }

    #[test]
    fn inactive_entry_means_no_shift() {
        let row = entry(0, "11:00", "19:00", false);
        assert_eq!(
            resolve_shift(monday(), Some(&row), &SalonSettings::default()),
            None
        );
    }

    #[test]
    fn malformed_entry_times_fall_back_to_opening_hours() {
        let row = entry(0, "eleven", "19:00", true);
        let shift = resolve_shift(monday(), Some(&row), &SalonSettings::default()).unwrap();
        assert_eq!(shift.start_min, FALLBACK_OPEN_MIN);
        assert_eq!(shift.end_min, FALLBACK_CLOSE_MIN);
    }

    #[test]
    fn no_entry_uses_weekday_default() {
        let shift = resolve_shift(monday(), None, &SalonSettings::default()).unwrap();
        assert_eq!(shift.start_min, 540);
        assert_eq!(shift.end_min, 1200);
    }

    #[test]
    fn no_entry_uses_weekend_default_on_saturday() {
        let shift = resolve_shift(saturday(), None, &SalonSettings::default()).unwrap();
        assert_eq!(shift.start_min, 600);
        assert_eq!(shift.end_min, 1080);
    }

    #[test]
    fn malformed_default_hours_fall_back_to_opening_hours() {
        let settings = SalonSettings {
            weekday_hours: "whenever".into(),
            ..SalonSettings::default()
        };
        let shift = resolve_shift(monday(), None, &settings).unwrap();
        assert_eq!(shift.start_min, FALLBACK_OPEN_MIN);
        assert_eq!(shift.end_min, FALLBACK_CLOSE_MIN);
    }
}
