use serde::{Deserialize, Serialize};

// ── Database rows ──

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub is_bookable: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_min: i64,
    pub is_active: bool,
    pub sort_order: i64,
}

/// One weekly-template entry. Unique per (staff_id, day_of_week);
/// day_of_week is 0–6 counted from Monday.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyScheduleRow {
    pub id: i64,
    pub staff_id: i64,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

/// Single-row salon configuration (id = 1). Hour ranges use the stored
/// "HH:MM - HH:MM" format; absent or empty lunch fields mean no lunch
/// exclusion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalonSettings {
    pub weekday_hours: String,
    pub weekend_hours: String,
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
    pub timezone_offset: String,
    pub lead_time_min: i64,
}

impl Default for SalonSettings {
    fn default() -> Self {
        Self {
            weekday_hours: "09:00 - 20:00".into(),
            weekend_hours: "10:00 - 18:00".into(),
            lunch_start: None,
            lunch_end: None,
            timezone_offset: "+03:00".into(),
            lead_time_min: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HolidayRow {
    pub date: String,
    pub is_closed: bool,
    /// JSON array of staff ids exempt from the closure.
    pub exception_staff_ids: String,
}

/// Half-open "YYYY-MM-DD HH:MM" range; may cover part of a day or many days.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeOffRow {
    pub id: i64,
    pub staff_id: i64,
    pub start_at: String,
    pub end_at: String,
    pub reason: Option<String>,
}

/// Soft reservation created mid-checkout. Invisible once expires_at <= now.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HoldRow {
    pub id: i64,
    pub staff_id: i64,
    pub date: String,
    pub start_time: String,
    pub expires_at: String,
}

// ── Computed results (never persisted) ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub time: String,
    pub is_optimal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffSlots {
    pub staff_id: i64,
    pub staff_name: String,
    pub slots: Vec<Slot>,
}

// ── API request/response types ──

#[derive(Debug, Deserialize)]
pub struct DaySlotsQuery {
    pub staff_id: i64,
    pub date: String,
    pub service_id: Option<i64>,
    pub service: Option<String>,
    pub duration_min: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub date: String,
    pub service_id: Option<i64>,
    pub service: Option<String>,
    pub duration_min: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DatesQuery {
    pub year: i32,
    pub month: u32,
    pub staff_id: Option<i64>,
    pub service_id: Option<i64>,
    pub service: Option<String>,
    pub duration_min: Option<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScheduleEntryInput {
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpsertScheduleRequest {
    pub entries: Vec<ScheduleEntryInput>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeOffRequest {
    pub staff_id: i64,
    pub start_at: String,
    pub end_at: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertHolidayRequest {
    #[serde(default = "default_true")]
    pub is_closed: bool,
    #[serde(default)]
    pub exception_staff_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub weekday_hours: Option<String>,
    pub weekend_hours: Option<String>,
    /// An empty string disables the lunch break.
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
    pub timezone_offset: Option<String>,
    pub lead_time_min: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub is_bookable: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStaffRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_bookable: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_min: i64,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_min: Option<i64>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
