use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    auth,
    models::*,
    schedule::shift::parse_hhmm,
    schedule::{exclusions, DATE_FMT},
    AppState,
};

type AdminError = (StatusCode, Json<ApiResponse<()>>);

fn err(status: StatusCode, msg: &str) -> AdminError {
    (status, Json(ApiResponse::error(msg)))
}

fn db_error(e: sqlx::Error) -> AdminError {
    tracing::error!("admin query failed: {}", e);
    err(StatusCode::INTERNAL_SERVER_ERROR, "DB error")
}

/// Every admin endpoint starts here: bearer token from the Authorization
/// header, verified against the configured admin token.
fn extract_admin(headers: &HeaderMap, state: &AppState) -> Result<(), AdminError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| err(StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

    if !auth::verify_admin_header(header, &state.admin_token) {
        return Err(err(StatusCode::FORBIDDEN, "Invalid admin token"));
    }
    Ok(())
}

fn validate_date(raw: &str) -> Result<(), AdminError> {
    NaiveDate::parse_from_str(raw, DATE_FMT)
        .map(|_| ())
        .map_err(|_| err(StatusCode::BAD_REQUEST, "Invalid date, expected YYYY-MM-DD"))
}

fn validate_datetime(raw: &str) -> Result<(), AdminError> {
    exclusions::parse_datetime(raw).map(|_| ()).ok_or_else(|| {
        err(
            StatusCode::BAD_REQUEST,
            "Invalid datetime, expected YYYY-MM-DD HH:MM",
        )
    })
}

// ── Weekly schedule ──

/// GET /api/admin/schedule/:staff_id — the staff member's weekly template.
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(staff_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<WeeklyScheduleRow>>>, AdminError> {
    extract_admin(&headers, &state)?;

    let rows = sqlx::query_as::<_, WeeklyScheduleRow>(
        "SELECT id, staff_id, day_of_week, start_time, end_time, is_active
         FROM weekly_schedule WHERE staff_id = ? ORDER BY day_of_week ASC",
    )
    .bind(staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(rows)))
}

/// PUT /api/admin/schedule/:staff_id — upsert weekly template entries.
pub async fn upsert_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(staff_id): Path<i64>,
    Json(body): Json<UpsertScheduleRequest>,
) -> Result<Json<ApiResponse<Vec<WeeklyScheduleRow>>>, AdminError> {
    extract_admin(&headers, &state)?;

    for entry in &body.entries {
        if !(0..=6).contains(&entry.day_of_week) {
            return Err(err(StatusCode::BAD_REQUEST, "day_of_week must be 0-6"));
        }
        match (parse_hhmm(&entry.start_time), parse_hhmm(&entry.end_time)) {
            (Some(start), Some(end)) if start < end => {}
            _ => return Err(err(StatusCode::BAD_REQUEST, "Invalid shift times")),
        }
    }

    for entry in &body.entries {
        sqlx::query(
            "INSERT INTO weekly_schedule (staff_id, day_of_week, start_time, end_time, is_active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(staff_id, day_of_week) DO UPDATE SET
                 start_time = excluded.start_time,
                 end_time = excluded.end_time,
                 is_active = excluded.is_active",
        )
        .bind(staff_id)
        .bind(entry.day_of_week)
        .bind(&entry.start_time)
        .bind(&entry.end_time)
        .bind(entry.is_active)
        .execute(&state.db)
        .await
        .map_err(db_error)?;
    }

    let rows = sqlx::query_as::<_, WeeklyScheduleRow>(
        "SELECT id, staff_id, day_of_week, start_time, end_time, is_active
         FROM weekly_schedule WHERE staff_id = ? ORDER BY day_of_week ASC",
    )
    .bind(staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(rows)))
}

// ── Time off ──

/// POST /api/admin/time-off — add a time-off interval.
pub async fn create_time_off(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTimeOffRequest>,
) -> Result<Json<ApiResponse<TimeOffRow>>, AdminError> {
    extract_admin(&headers, &state)?;

    validate_datetime(&body.start_at)?;
    validate_datetime(&body.end_at)?;
    if body.start_at >= body.end_at {
        return Err(err(StatusCode::BAD_REQUEST, "start_at must precede end_at"));
    }

    let id = sqlx::query(
        "INSERT INTO time_off (staff_id, start_at, end_at, reason) VALUES (?, ?, ?, ?)",
    )
    .bind(body.staff_id)
    .bind(&body.start_at)
    .bind(&body.end_at)
    .bind(&body.reason)
    .execute(&state.db)
    .await
    .map_err(db_error)?
    .last_insert_rowid();

    let row = sqlx::query_as::<_, TimeOffRow>(
        "SELECT id, staff_id, start_at, end_at, reason FROM time_off WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(row)))
}

/// DELETE /api/admin/time-off/:id
pub async fn delete_time_off(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    extract_admin(&headers, &state)?;

    let affected = sqlx::query("DELETE FROM time_off WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(db_error)?
        .rows_affected();

    if affected == 0 {
        return Err(err(StatusCode::NOT_FOUND, "Time-off entry not found"));
    }
    Ok(Json(ApiResponse::success(())))
}

// ── Holidays ──

/// PUT /api/admin/holidays/:date — set or update a holiday override.
pub async fn upsert_holiday(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
    Json(body): Json<UpsertHolidayRequest>,
) -> Result<Json<ApiResponse<HolidayRow>>, AdminError> {
    extract_admin(&headers, &state)?;
    validate_date(&date)?;

    let exceptions = serde_json::to_string(&body.exception_staff_ids)
        .map_err(|_| err(StatusCode::BAD_REQUEST, "Invalid exception list"))?;

    sqlx::query(
        "INSERT INTO holidays (date, is_closed, exception_staff_ids) VALUES (?, ?, ?)
         ON CONFLICT(date) DO UPDATE SET
             is_closed = excluded.is_closed,
             exception_staff_ids = excluded.exception_staff_ids",
    )
    .bind(&date)
    .bind(body.is_closed)
    .bind(&exceptions)
    .execute(&state.db)
    .await
    .map_err(db_error)?;

    let row = sqlx::query_as::<_, HolidayRow>(
        "SELECT date, is_closed, exception_staff_ids FROM holidays WHERE date = ?",
    )
    .bind(&date)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(row)))
}

/// DELETE /api/admin/holidays/:date
pub async fn delete_holiday(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(date): Path<String>,
) -> Result<Json<ApiResponse<()>>, AdminError> {
    extract_admin(&headers, &state)?;

    let affected = sqlx::query("DELETE FROM holidays WHERE date = ?")
        .bind(&date)
        .execute(&state.db)
        .await
        .map_err(db_error)?
        .rows_affected();

    if affected == 0 {
        return Err(err(StatusCode::NOT_FOUND, "Holiday not found"));
    }
    Ok(Json(ApiResponse::success(())))
}

// ── Salon settings ──

/// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SalonSettings>>, AdminError> {
    extract_admin(&headers, &state)?;

    let settings = sqlx::query_as::<_, SalonSettings>(
        "SELECT weekday_hours, weekend_hours, lunch_start, lunch_end,
                timezone_offset, lead_time_min
         FROM salon_settings WHERE id = 1",
    )
    .fetch_optional(&state.db)
    .await
    .map_err(db_error)?
    .unwrap_or_default();

    Ok(Json(ApiResponse::success(settings)))
}

/// PUT /api/admin/settings — update provided fields only. An empty string
/// in lunch_start/lunch_end disables the lunch break.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<SalonSettings>>, AdminError> {
    extract_admin(&headers, &state)?;

    if let Some(hours) = &body.weekday_hours {
        sqlx::query("UPDATE salon_settings SET weekday_hours = ? WHERE id = 1")
            .bind(hours)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(hours) = &body.weekend_hours {
        sqlx::query("UPDATE salon_settings SET weekend_hours = ? WHERE id = 1")
            .bind(hours)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(lunch) = &body.lunch_start {
        sqlx::query("UPDATE salon_settings SET lunch_start = NULLIF(?, '') WHERE id = 1")
            .bind(lunch)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(lunch) = &body.lunch_end {
        sqlx::query("UPDATE salon_settings SET lunch_end = NULLIF(?, '') WHERE id = 1")
            .bind(lunch)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(offset) = &body.timezone_offset {
        sqlx::query("UPDATE salon_settings SET timezone_offset = ? WHERE id = 1")
            .bind(offset)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(minutes) = body.lead_time_min {
        sqlx::query("UPDATE salon_settings SET lead_time_min = ? WHERE id = 1")
            .bind(minutes)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }

    let settings = sqlx::query_as::<_, SalonSettings>(
        "SELECT weekday_hours, weekend_hours, lunch_start, lunch_end,
                timezone_offset, lead_time_min
         FROM salon_settings WHERE id = 1",
    )
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(settings)))
}

// ── Staff ──

/// POST /api/admin/staff
pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateStaffRequest>,
) -> Result<Json<ApiResponse<Staff>>, AdminError> {
    extract_admin(&headers, &state)?;

    if body.name.trim().is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "Staff name required"));
    }

    let id = sqlx::query("INSERT INTO staff (name, is_bookable, sort_order) VALUES (?, ?, ?)")
        .bind(body.name.trim())
        .bind(body.is_bookable.unwrap_or(true))
        .bind(body.sort_order.unwrap_or(0))
        .execute(&state.db)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, name, is_active, is_bookable, sort_order FROM staff WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(staff)))
}

/// PUT /api/admin/staff/:id
pub async fn update_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStaffRequest>,
) -> Result<Json<ApiResponse<Staff>>, AdminError> {
    extract_admin(&headers, &state)?;

    if let Some(name) = &body.name {
        sqlx::query("UPDATE staff SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE staff SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(bookable) = body.is_bookable {
        sqlx::query("UPDATE staff SET is_bookable = ? WHERE id = ?")
            .bind(bookable)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(order) = body.sort_order {
        sqlx::query("UPDATE staff SET sort_order = ? WHERE id = ?")
            .bind(order)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }

    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, name, is_active, is_bookable, sort_order FROM staff WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_error)?
    .ok_or_else(|| err(StatusCode::NOT_FOUND, "Staff not found"))?;

    Ok(Json(ApiResponse::success(staff)))
}

// ── Services ──

/// POST /api/admin/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, AdminError> {
    extract_admin(&headers, &state)?;

    if body.duration_min <= 0 {
        return Err(err(StatusCode::BAD_REQUEST, "duration_min must be positive"));
    }

    let id = sqlx::query(
        "INSERT INTO services (name, description, price, duration_min, sort_order)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&body.name)
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.price)
    .bind(body.duration_min)
    .bind(body.sort_order.unwrap_or(0))
    .execute(&state.db)
    .await
    .map_err(db_error)?
    .last_insert_rowid();

    let service = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, duration_min, is_active, sort_order
         FROM services WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(ApiResponse::success(service)))
}

/// PUT /api/admin/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, AdminError> {
    extract_admin(&headers, &state)?;

    if let Some(name) = &body.name {
        sqlx::query("UPDATE services SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(desc) = &body.description {
        sqlx::query("UPDATE services SET description = ? WHERE id = ?")
            .bind(desc)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(price) = body.price {
        sqlx::query("UPDATE services SET price = ? WHERE id = ?")
            .bind(price)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(duration) = body.duration_min {
        if duration <= 0 {
            return Err(err(StatusCode::BAD_REQUEST, "duration_min must be positive"));
        }
        sqlx::query("UPDATE services SET duration_min = ? WHERE id = ?")
            .bind(duration)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE services SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }
    if let Some(order) = body.sort_order {
        sqlx::query("UPDATE services SET sort_order = ? WHERE id = ?")
            .bind(order)
            .bind(id)
            .execute(&state.db)
            .await
            .map_err(db_error)?;
    }

    let service = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, duration_min, is_active, sort_order
         FROM services WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_error)?
    .ok_or_else(|| err(StatusCode::NOT_FOUND, "Service not found"))?;

    Ok(Json(ApiResponse::success(service)))
}
