use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::models::{HoldRow, SalonSettings, TimeOffRow};

use super::shift::parse_hhmm;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Stored datetime format for time-off and hold expiry columns.
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M";

/// Half-open `[start, end)` span in minutes from the day's midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteSpan {
    pub start: u32,
    pub end: u32,
}

impl MinuteSpan {
    pub fn overlaps(&self, other: &MinuteSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A confirmed booking for one staff member on one day, already expanded
/// to minutes by the aggregator (duration from the service catalog).
#[derive(Debug, Clone, Copy)]
pub struct BookingSpan {
    pub start_min: u32,
    pub duration_min: u32,
}

/// Everything that makes part of a day unbookable for one staff member,
/// plus the boundary minute sets the optimality classifier reads.
#[derive(Debug, Default)]
pub struct DayExclusions {
    pub intervals: Vec<MinuteSpan>,
    pub booking_starts: HashSet<u32>,
    pub booking_ends: HashSet<u32>,
    /// Active holds block exactly their own start minute. A hold does not
    /// know the requested duration yet, so it never widens to a window.
    pub hold_starts: HashSet<u32>,
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), DATETIME_FMT).ok()
}

fn minute_of(dt: NaiveDateTime) -> u32 {
    dt.time().hour() * 60 + dt.time().minute()
}

/// Merge lunch, time-off, bookings and active holds into the exclusion set
/// for `date`. `now` is the salon-local wall clock used for hold expiry.
pub fn collect_unavailability(
    date: NaiveDate,
    settings: &SalonSettings,
    time_off: &[TimeOffRow],
    bookings: &[BookingSpan],
    holds: &[HoldRow],
    now: NaiveDateTime,
) -> DayExclusions {
    let mut out = DayExclusions::default();

    // Lunch applies only when both ends are present and parseable;
    // anything else is silently no-lunch.
    if let (Some(ls), Some(le)) = (&settings.lunch_start, &settings.lunch_end) {
        if let (Some(start), Some(end)) = (parse_hhmm(ls), parse_hhmm(le)) {
            if start < end {
                out.intervals.push(MinuteSpan { start, end });
            }
        }
    }

    let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    let day_end = day_start + chrono::Duration::days(1);
    for row in time_off {
        let (start, end) = match (parse_datetime(&row.start_at), parse_datetime(&row.end_at)) {
            (Some(s), Some(e)) if s < e => (s, e),
            _ => {
                tracing::warn!(id = row.id, staff_id = row.staff_id, "skipping unparseable time-off range");
                continue;
            }
        };
        if end <= day_start || start >= day_end {
            continue;
        }
        // Clamp the overlapping part into this day's minute space.
        let start_min = if start <= day_start { 0 } else { minute_of(start) };
        let end_min = if end >= day_end { MINUTES_PER_DAY } else { minute_of(end) };
        if start_min < end_min {
            out.intervals.push(MinuteSpan {
                start: start_min,
                end: end_min,
            });
        }
    }

    for b in bookings {
        let end = (b.start_min + b.duration_min).min(MINUTES_PER_DAY);
        out.intervals.push(MinuteSpan {
            start: b.start_min,
            end,
        });
        out.booking_starts.insert(b.start_min);
        out.booking_ends.insert(end);
    }

    for h in holds {
        // Expired holds are invisible; they are never swept, only filtered.
        match parse_datetime(&h.expires_at) {
            Some(expires) if expires > now => {}
            _ => continue,
        }
        if let Some(minute) = parse_hhmm(&h.start_time) {
            out.hold_starts.insert(minute);
        }
    }

    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    fn noonish() -> NaiveDateTime {
        date().and_hms_opt(12, 0, 0).unwrap()
    }

    fn time_off(start_at: &str, end_at: &str) -> TimeOffRow {
        TimeOffRow {
            id: 1,
            staff_id: 7,
            start_at: start_at.into(),
            end_at: end_at.into(),
            reason: None,
        }
    }

    fn hold(start_time: &str, expires_at: &str) -> HoldRow {
        HoldRow {
            id: 1,
            staff_id: 7,
            date: "2025-06-10".into(),
            start_time: start_time.into(),
            expires_at: expires_at.into(),
        }
    }

    fn settings_with_lunch(start: &str, end: &str) -> SalonSettings {
        SalonSettings {
            lunch_start: Some(start.into()),
            lunch_end: Some(end.into()),
            ..SalonSettings::default()
        }
    }

    #[test]
    fn minute_span_overlap_is_half_open() {
        let a = MinuteSpan { start: 600, end: 660 };
        assert!(a.overlaps(&MinuteSpan { start: 630, end: 700 }));
        assert!(!a.overlaps(&MinuteSpan { start: 660, end: 720 })); // adjacent
        assert!(!a.overlaps(&MinuteSpan { start: 540, end: 600 }));
    }

    #[test]
    fn lunch_becomes_interval() {
        let excl = collect_unavailability(
            date(),
            &settings_with_lunch("14:00", "15:00"),
            &[],
            &[],
            &[],
            noonish(),
        );
        assert_eq!(excl.intervals, vec![MinuteSpan { start: 840, end: 900 }]);
    }

    #[test]
    fn malformed_lunch_is_silently_skipped() {
        let excl = collect_unavailability(
            date(),
            &settings_with_lunch("lunchtime", "15:00"),
            &[],
            &[],
            &[],
            noonish(),
        );
        assert!(excl.intervals.is_empty());
    }

    #[test]
    fn missing_lunch_end_is_skipped() {
        let settings = SalonSettings {
            lunch_start: Some("14:00".into()),
            lunch_end: None,
            ..SalonSettings::default()
        };
        let excl = collect_unavailability(date(), &settings, &[], &[], &[], noonish());
        assert!(excl.intervals.is_empty());
    }

    #[test]
    fn time_off_inside_day_is_clamped_to_minutes() {
        let rows = [time_off("2025-06-10 13:00", "2025-06-10 16:30")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &rows,
            &[],
            &[],
            noonish(),
        );
        assert_eq!(excl.intervals, vec![MinuteSpan { start: 780, end: 990 }]);
    }

    #[test]
    fn multi_day_time_off_covers_whole_day() {
        let rows = [time_off("2025-06-08 00:00", "2025-06-12 00:00")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &rows,
            &[],
            &[],
            noonish(),
        );
        assert_eq!(
            excl.intervals,
            vec![MinuteSpan { start: 0, end: MINUTES_PER_DAY }]
        );
    }

    #[test]
    fn time_off_ending_at_midnight_does_not_leak_into_day() {
        let rows = [time_off("2025-06-09 18:00", "2025-06-10 00:00")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &rows,
            &[],
            &[],
            noonish(),
        );
        assert!(excl.intervals.is_empty());
    }

    #[test]
    fn partial_overlap_from_previous_day_is_clamped_at_zero() {
        let rows = [time_off("2025-06-09 22:00", "2025-06-10 11:00")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &rows,
            &[],
            &[],
            noonish(),
        );
        assert_eq!(excl.intervals, vec![MinuteSpan { start: 0, end: 660 }]);
    }

    #[test]
    fn unparseable_time_off_is_skipped() {
        let rows = [time_off("next tuesday", "2025-06-10 11:00")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &rows,
            &[],
            &[],
            noonish(),
        );
        assert!(excl.intervals.is_empty());
    }

    #[test]
    fn bookings_expand_and_fill_boundary_sets() {
        let bookings = [BookingSpan { start_min: 840, duration_min: 60 }];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &[],
            &bookings,
            &[],
            noonish(),
        );
        assert_eq!(excl.intervals, vec![MinuteSpan { start: 840, end: 900 }]);
        assert!(excl.booking_starts.contains(&840));
        assert!(excl.booking_ends.contains(&900));
    }

    #[test]
    fn active_hold_blocks_only_its_start_minute() {
        let holds = [hold("14:00", "2025-06-10 12:10")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &[],
            &[],
            &holds,
            noonish(),
        );
        assert!(excl.hold_starts.contains(&840));
        assert!(excl.intervals.is_empty());
    }

    #[test]
    fn expired_hold_is_invisible() {
        let holds = [hold("14:00", "2025-06-10 11:59")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &[],
            &[],
            &holds,
            noonish(),
        );
        assert!(excl.hold_starts.is_empty());
    }

    #[test]
    fn hold_expiring_exactly_now_is_invisible() {
        let holds = [hold("14:00", "2025-06-10 12:00")];
        let excl = collect_unavailability(
            date(),
            &SalonSettings::default(),
            &[],
            &[],
            &holds,
            noonish(),
        );
        assert!(excl.hold_starts.is_empty());
    }
}
