use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    models::*,
    schedule::{DATE_FMT, DEFAULT_SERVICE_DURATION_MIN},
    AppState,
};

fn parse_date(raw: &str) -> Result<NaiveDate, StatusCode> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|_| StatusCode::BAD_REQUEST)
}

/// Resolve a service duration in minutes: an explicit value wins, then the
/// catalog by id, then a fuzzy name match, then the 60-minute default.
/// Missing rows degrade to the default; only storage errors propagate.
pub async fn resolve_duration(
    db: &sqlx::SqlitePool,
    explicit: Option<i64>,
    service_id: Option<i64>,
    service_name: Option<&str>,
) -> anyhow::Result<u32> {
    if let Some(minutes) = explicit {
        if minutes > 0 {
            return Ok(minutes as u32);
        }
    }

    if let Some(id) = service_id {
        let duration = sqlx::query_scalar::<_, i64>(
            "SELECT duration_min FROM services WHERE id = ? AND is_active = 1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        if let Some(minutes) = duration {
            if minutes > 0 {
                return Ok(minutes as u32);
            }
        }
    }

    if let Some(name) = service_name {
        let pattern = format!("%{}%", name.trim());
        let duration = sqlx::query_scalar::<_, i64>(
            "SELECT duration_min FROM services WHERE is_active = 1 AND name LIKE ?
             ORDER BY sort_order ASC, id ASC LIMIT 1",
        )
        .bind(&pattern)
        .fetch_optional(db)
        .await?;
        if let Some(minutes) = duration {
            if minutes > 0 {
                return Ok(minutes as u32);
            }
        }
    }

    Ok(DEFAULT_SERVICE_DURATION_MIN)
}

// ── Endpoints ──

/// GET /api/schedule/slots?staff_id=N&date=YYYY-MM-DD&service_id=N —
/// bookable slots for one staff member on one date.
pub async fn day_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaySlotsQuery>,
) -> Result<Json<ApiResponse<Vec<Slot>>>, StatusCode> {
    let date = parse_date(&query.date)?;
    let duration = resolve_duration(
        &state.db,
        query.duration_min,
        query.service_id,
        query.service.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!("day_slots duration lookup: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let slots = state
        .schedule
        .day_slots(query.staff_id, date, duration)
        .await
        .map_err(|e| {
            tracing::error!("day_slots: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ApiResponse::success(slots)))
}

/// GET /api/schedule/overview?date=YYYY-MM-DD&service_id=N — slots for
/// every bookable staff member on one date; staff with none are omitted.
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<ApiResponse<Vec<StaffSlots>>>, StatusCode> {
    let date = parse_date(&query.date)?;
    let duration = resolve_duration(
        &state.db,
        query.duration_min,
        query.service_id,
        query.service.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!("overview duration lookup: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let staff_slots = state
        .schedule
        .all_staff_day_slots(date, duration)
        .await
        .map_err(|e| {
            tracing::error!("overview: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ApiResponse::success(staff_slots)))
}

/// GET /api/schedule/dates?year=2025&month=6&staff_id=N — dates in the
/// month with at least one bookable slot. Without staff_id, any staff
/// member counts.
pub async fn available_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatesQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, StatusCode> {
    if !(1..=12).contains(&query.month) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let duration = resolve_duration(
        &state.db,
        query.duration_min,
        query.service_id,
        query.service.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!("available_dates duration lookup: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let dates = state
        .schedule
        .available_dates(query.staff_id, query.year, query.month, duration)
        .await
        .map_err(|e| {
            tracing::error!("available_dates: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ApiResponse::success(dates)))
}

/// GET /api/services — active services for pickers.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Service>>>, StatusCode> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, name, description, price, duration_min, is_active, sort_order
         FROM services WHERE is_active = 1 ORDER BY sort_order ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("list_services: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ApiResponse::success(services)))
}

/// GET /api/staff — active, bookable staff for pickers.
pub async fn list_staff(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Staff>>>, StatusCode> {
    let staff = sqlx::query_as::<_, Staff>(
        "SELECT id, name, is_active, is_bookable, sort_order FROM staff
         WHERE is_active = 1 AND is_bookable = 1
         ORDER BY sort_order ASC, id ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("list_staff: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ApiResponse::success(staff)))
}
