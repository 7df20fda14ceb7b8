pub mod exclusions;
pub mod shift;
pub mod slots;

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use sqlx::SqlitePool;

use crate::models::{HoldRow, SalonSettings, Slot, Staff, StaffSlots, TimeOffRow, WeeklyScheduleRow};

use exclusions::{collect_unavailability, BookingSpan, DayExclusions};
use shift::{day_of_week, resolve_shift, ShiftWindow};
use slots::{generate_slots, has_free_slot};

/// Used when neither the request nor the service catalog yields a duration.
pub const DEFAULT_SERVICE_DURATION_MIN: u32 = 60;

pub const DATE_FMT: &str = "%Y-%m-%d";

/// Salon timezone used when the stored offset string is unparseable (UTC+3).
const FALLBACK_TZ_OFFSET_SECS: i32 = 3 * 3600;

/// The availability engine. A stateless read path: every operation loads
/// what it needs, computes in memory, and returns plain data. Nothing here
/// mutates the database.
#[derive(Clone)]
pub struct ScheduleService {
    db: SqlitePool,
}

struct HolidayInfo {
    is_closed: bool,
    exceptions: HashSet<i64>,
}

/// Everything the per-day computation reads, bulk-fetched up front.
/// Bookings are keyed by lowercased staff name because the booking store
/// records free-text staff names; schedules, time-off and holds key by id.
struct ScheduleContext {
    settings: SalonSettings,
    staff: Vec<Staff>,
    schedules: HashMap<(i64, u32), WeeklyScheduleRow>,
    time_off: HashMap<i64, Vec<TimeOffRow>>,
    bookings: HashMap<(String, String), Vec<BookingSpan>>,
    holds: HashMap<(i64, String), Vec<HoldRow>>,
    holidays: HashMap<String, HolidayInfo>,
    /// Salon-local wall clock, fixed for the whole computation.
    now: NaiveDateTime,
}

impl ScheduleService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Bookable slots for one staff member on one date. Unknown, inactive
    /// or non-bookable staff yields an empty list, not an error.
    pub async fn day_slots(
        &self,
        staff_id: i64,
        date: NaiveDate,
        duration_min: u32,
    ) -> Result<Vec<Slot>> {
        let ctx = self.load_context(date, date, Some(staff_id)).await?;
        let Some(staff) = ctx.staff.first() else {
            return Ok(Vec::new());
        };
        Ok(compute_day_slots(&ctx, staff, date, duration_min))
    }

    /// Per-staff slot lists for one date; staff with nothing free are
    /// omitted. Used by calendar overviews.
    pub async fn all_staff_day_slots(
        &self,
        date: NaiveDate,
        duration_min: u32,
    ) -> Result<Vec<StaffSlots>> {
        let ctx = self.load_context(date, date, None).await?;
        let mut out = Vec::new();
        for staff in &ctx.staff {
            let slots = compute_day_slots(&ctx, staff, date, duration_min);
            if !slots.is_empty() {
                out.push(StaffSlots {
                    staff_id: staff.id,
                    staff_name: staff.name.clone(),
                    slots,
                });
            }
        }
        Ok(out)
    }

    /// Dates in the month with at least one bookable slot, for a specific
    /// staff member or (with `None`) any staff. Fetches each constraint
    /// source once for the whole range, then iterates days purely in
    /// memory; "any staff" stops at the first staff member with a free
    /// slot per day.
    pub async fn available_dates(
        &self,
        staff_id: Option<i64>,
        year: i32,
        month: u32,
        duration_min: u32,
    ) -> Result<Vec<String>> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Ok(Vec::new());
        };
        let last = month_last_day(first);
        let ctx = self.load_context(first, last, staff_id).await?;

        let mut dates = Vec::new();
        let mut date = first;
        while date <= last {
            if ctx
                .staff
                .iter()
                .any(|staff| day_has_slot(&ctx, staff, date, duration_min))
            {
                dates.push(date.format(DATE_FMT).to_string());
            }
            date += chrono::Duration::days(1);
        }
        Ok(dates)
    }

    async fn load_settings(&self) -> Result<SalonSettings> {
        let settings = sqlx::query_as::<_, SalonSettings>(
            "SELECT weekday_hours, weekend_hours, lunch_start, lunch_end,
                    timezone_offset, lead_time_min
             FROM salon_settings WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;

        Ok(settings.unwrap_or_else(|| {
            tracing::warn!("salon_settings row missing, using built-in defaults");
            SalonSettings::default()
        }))
    }

    /// One read pass for `[from, to]`: a constant number of queries
    /// regardless of how many days or staff members the range covers.
    async fn load_context(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        staff_id: Option<i64>,
    ) -> Result<ScheduleContext> {
        let settings = self.load_settings().await?;

        let offset = parse_tz_offset(&settings.timezone_offset).unwrap_or_else(|| {
            tracing::warn!(
                offset = %settings.timezone_offset,
                "unparseable salon timezone offset, assuming +03:00"
            );
            FixedOffset::east_opt(FALLBACK_TZ_OFFSET_SECS).unwrap()
        });
        let now = Utc::now().with_timezone(&offset).naive_local();

        let from_key = from.format(DATE_FMT).to_string();
        let to_key = to.format(DATE_FMT).to_string();
        let range_start = format!("{} 00:00", from_key);
        let range_end = format!(
            "{} 00:00",
            (to + chrono::Duration::days(1)).format(DATE_FMT)
        );
        let now_key = now.format(exclusions::DATETIME_FMT).to_string();

        let staff = sqlx::query_as::<_, Staff>(
            "SELECT id, name, is_active, is_bookable, sort_order FROM staff
             WHERE is_active = 1 AND is_bookable = 1 AND (? IS NULL OR id = ?)
             ORDER BY sort_order ASC, id ASC",
        )
        .bind(staff_id)
        .bind(staff_id)
        .fetch_all(&self.db)
        .await?;

        let schedule_rows = sqlx::query_as::<_, WeeklyScheduleRow>(
            "SELECT id, staff_id, day_of_week, start_time, end_time, is_active
             FROM weekly_schedule WHERE (? IS NULL OR staff_id = ?)",
        )
        .bind(staff_id)
        .bind(staff_id)
        .fetch_all(&self.db)
        .await?;
        let mut schedules = HashMap::new();
        for row in schedule_rows {
            schedules.insert((row.staff_id, row.day_of_week.rem_euclid(7) as u32), row);
        }

        let time_off_rows = sqlx::query_as::<_, TimeOffRow>(
            "SELECT id, staff_id, start_at, end_at, reason FROM time_off
             WHERE start_at < ? AND end_at > ? AND (? IS NULL OR staff_id = ?)",
        )
        .bind(&range_end)
        .bind(&range_start)
        .bind(staff_id)
        .bind(staff_id)
        .fetch_all(&self.db)
        .await?;
        let mut time_off: HashMap<i64, Vec<TimeOffRow>> = HashMap::new();
        for row in time_off_rows {
            time_off.entry(row.staff_id).or_default().push(row);
        }

        // Bookings come keyed by free-text staff name; lowercase once here
        // so the per-day lookup is a plain map hit.
        let booking_rows = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT b.staff_name, b.date, b.start_time, COALESCE(s.duration_min, 60)
             FROM bookings b
             LEFT JOIN services s ON s.id = b.service_id
             WHERE b.date >= ? AND b.date <= ? AND b.status != 'cancelled'",
        )
        .bind(&from_key)
        .bind(&to_key)
        .fetch_all(&self.db)
        .await?;
        let mut bookings: HashMap<(String, String), Vec<BookingSpan>> = HashMap::new();
        for (staff_name, date, start_time, duration_min) in booking_rows {
            let Some(start_min) = shift::parse_hhmm(&start_time) else {
                tracing::warn!(date = %date, time = %start_time, "skipping booking with unparseable start time");
                continue;
            };
            let duration_min = if duration_min > 0 {
                duration_min as u32
            } else {
                DEFAULT_SERVICE_DURATION_MIN
            };
            bookings
                .entry((staff_name.to_lowercase(), date))
                .or_default()
                .push(BookingSpan {
                    start_min,
                    duration_min,
                });
        }

        let hold_rows = sqlx::query_as::<_, HoldRow>(
            "SELECT id, staff_id, date, start_time, expires_at FROM booking_holds
             WHERE date >= ? AND date <= ? AND expires_at > ?
               AND (? IS NULL OR staff_id = ?)",
        )
        .bind(&from_key)
        .bind(&to_key)
        .bind(&now_key)
        .bind(staff_id)
        .bind(staff_id)
        .fetch_all(&self.db)
        .await?;
        let mut holds: HashMap<(i64, String), Vec<HoldRow>> = HashMap::new();
        for row in hold_rows {
            holds
                .entry((row.staff_id, row.date.clone()))
                .or_default()
                .push(row);
        }

        let holiday_rows = sqlx::query_as::<_, crate::models::HolidayRow>(
            "SELECT date, is_closed, exception_staff_ids FROM holidays
             WHERE date >= ? AND date <= ?",
        )
        .bind(&from_key)
        .bind(&to_key)
        .fetch_all(&self.db)
        .await?;
        let mut holidays = HashMap::new();
        for row in holiday_rows {
            let exceptions: HashSet<i64> = match serde_json::from_str::<Vec<i64>>(&row.exception_staff_ids) {
                Ok(ids) => ids.into_iter().collect(),
                Err(_) => {
                    tracing::warn!(date = %row.date, "unparseable holiday exception list, treating as empty");
                    HashSet::new()
                }
            };
            holidays.insert(
                row.date,
                HolidayInfo {
                    is_closed: row.is_closed,
                    exceptions,
                },
            );
        }

        Ok(ScheduleContext {
            settings,
            staff,
            schedules,
            time_off,
            bookings,
            holds,
            holidays,
            now,
        })
    }
}

/// Shared per-day preamble: holiday gate, shift resolution, exclusion
/// collection, lead-time cutoff. `None` means no availability at all.
fn day_setup(
    ctx: &ScheduleContext,
    staff: &Staff,
    date: NaiveDate,
) -> Option<(ShiftWindow, DayExclusions, Option<u32>)> {
    let date_key = date.format(DATE_FMT).to_string();

    if let Some(holiday) = ctx.holidays.get(&date_key) {
        // Closure dominates the weekly template unless this staff member
        // is explicitly excepted.
        if holiday.is_closed && !holiday.exceptions.contains(&staff.id) {
            return None;
        }
    }

    let entry = ctx.schedules.get(&(staff.id, day_of_week(date)));
    let shift = resolve_shift(date, entry, &ctx.settings)?;

    let time_off = ctx
        .time_off
        .get(&staff.id)
        .map(|rows| rows.as_slice())
        .unwrap_or(&[]);
    let bookings = ctx
        .bookings
        .get(&(staff.name.to_lowercase(), date_key.clone()))
        .map(|rows| rows.as_slice())
        .unwrap_or(&[]);
    let holds = ctx
        .holds
        .get(&(staff.id, date_key))
        .map(|rows| rows.as_slice())
        .unwrap_or(&[]);

    let excl = collect_unavailability(date, &ctx.settings, time_off, bookings, holds, ctx.now);

    // The lead-time buffer exists only for same-day queries.
    let lead_cutoff = (date == ctx.now.date()).then(|| {
        let now_min = ctx.now.time().hour() * 60 + ctx.now.time().minute();
        now_min + ctx.settings.lead_time_min.max(0) as u32
    });

    Some((shift, excl, lead_cutoff))
}

fn compute_day_slots(
    ctx: &ScheduleContext,
    staff: &Staff,
    date: NaiveDate,
    duration_min: u32,
) -> Vec<Slot> {
    match day_setup(ctx, staff, date) {
        Some((shift, excl, lead_cutoff)) => generate_slots(shift, &excl, duration_min, lead_cutoff),
        None => Vec::new(),
    }
}

fn day_has_slot(ctx: &ScheduleContext, staff: &Staff, date: NaiveDate, duration_min: u32) -> bool {
    match day_setup(ctx, staff, date) {
        Some((shift, excl, lead_cutoff)) => has_free_slot(shift, &excl, duration_min, lead_cutoff),
        None => false,
    }
}

/// Parse a stored offset like "+03:00" or "-05:30" into a fixed offset.
fn parse_tz_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => (1, raw),
    };
    let (h, m) = rest.split_once(':')?;
    let h: i32 = h.parse().ok()?;
    let m: i32 = m.parse().ok()?;
    if h > 14 || m > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (h * 3600 + m * 60))
}

fn month_last_day(first: NaiveDate) -> NaiveDate {
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next_month.and_then(|d| d.pred_opt()).unwrap_or(first)
}

// ── Tests ──
//
// The engine is exercised against hand-built in-memory contexts; no
// database is involved. Facade wiring is thin enough that the pure path
// is the one worth covering.
