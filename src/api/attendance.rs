use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::matcher::match_face;
use crate::core::resolver::{CheckOutcome, resolve_check};
use crate::core::store::MySqlAttendanceStore;
use crate::error::AppError;
use crate::model::activity;
use crate::model::attendance::{AttendanceEvent, EventKind};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::{employee_cache, gallery};

#[derive(Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Embedding extracted from the captured frame by the caller.
    pub embedding: Vec<f64>,

    /// Path of the stored capture, if the caller kept it.
    #[schema(example = "static/attendance_images/attendance_20260115_081500.jpg", nullable = true)]
    pub image: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    #[schema(example = "Checked in for Jane Doe — 15 minutes late, penalty 50000")]
    pub message: String,

    pub event: AttendanceEvent,
}

/// Biometric check endpoint: match the sample against the gallery, then
/// record the day's IN or OUT for the matched employee.
#[utoipa::path(
    post,
    path = "/api/attendance/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Event recorded", body = CheckResponse),
        (status = 404, description = "No identity match or unknown employee"),
        (status = 409, description = "Attendance already complete for today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
    payload: web::Json<CheckRequest>,
) -> Result<HttpResponse, AppError> {
    let matched = match_face(&gallery::snapshot(), &payload.embedding)
        .ok_or(AppError::NoIdentityMatch)?;

    let employee = employee_cache::get(pool.get_ref(), matched)
        .await?
        .ok_or(AppError::EmployeeNotFound(matched))?;

    let now = chrono::Local::now().naive_local();
    let outcome = resolve_check(
        store.get_ref(),
        &employee,
        now,
        payload.image.clone(),
    )
    .await?;

    let stamp = now.format("%H:%M %d/%m/%Y");
    let message = match &outcome {
        CheckOutcome::CheckedIn(event) if event.late_minutes > 0 => format!(
            "Checked in for {} — {} minutes late, penalty {}",
            employee.full_name, event.late_minutes, event.late_penalty
        ),
        CheckOutcome::CheckedIn(_) => format!("Checked in for {}", employee.full_name),
        CheckOutcome::CheckedOut(event) if event.overtime_minutes > 0 => format!(
            "Checked out for {} — {} minutes overtime, pay {}",
            employee.full_name, event.overtime_minutes, event.overtime_pay
        ),
        CheckOutcome::CheckedOut(_) => format!("Checked out for {}", employee.full_name),
    };

    let (action, detail) = match &outcome {
        CheckOutcome::CheckedIn(_) => ("Check-in", format!("Checked in at {stamp}")),
        CheckOutcome::CheckedOut(_) => ("Check-out", format!("Checked out at {stamp}")),
    };
    activity::record(pool.get_ref(), employee.id, action, &detail).await;

    let event = match outcome {
        CheckOutcome::CheckedIn(e) | CheckOutcome::CheckedOut(e) => e,
    };
    Ok(HttpResponse::Ok().json(CheckResponse { message, event }))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    /// Substring match on the employee name.
    pub search: Option<String>,

    /// Exact day, `YYYY-MM-DD`. Ignored when `month` is present.
    pub date: Option<String>,

    /// Whole month, `YYYY-MM`.
    pub month: Option<String>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct HistoryRow {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "Jane Doe")]
    pub employee_name: String,

    #[schema(example = "2026-01-15T08:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,

    pub kind: EventKind,

    #[schema(nullable = true)]
    pub image: Option<String>,

    pub late_minutes: i32,

    #[schema(value_type = String)]
    pub late_penalty: rust_decimal::Decimal,

    pub overtime_minutes: i32,

    #[schema(value_type = String)]
    pub overtime_pay: rust_decimal::Decimal,
}

/// Attendance history, newest first, capped at 100 rows. Malformed date or
/// month filters are ignored rather than rejected.
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Matching events", body = [HistoryRow]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push("e.full_name LIKE ?");
        bindings.push(format!("%{}%", search.trim()));
    }

    let month_span = query
        .month
        .as_deref()
        .and_then(parse_month_filter);
    if let Some((start, end)) = month_span {
        conditions.push("a.timestamp >= ? AND a.timestamp < ?");
        bindings.push(start.format("%Y-%m-%d %H:%M:%S").to_string());
        bindings.push(end.format("%Y-%m-%d %H:%M:%S").to_string());
    } else if let Some(day) = query
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    {
        conditions.push("a.date = ?");
        bindings.push(day.format("%Y-%m-%d").to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT a.id, a.employee_id, e.full_name AS employee_name, a.timestamp, a.kind, \
                a.image, a.late_minutes, a.late_penalty, a.overtime_minutes, a.overtime_pay \
         FROM attendance a \
         JOIN employees e ON e.id = a.employee_id \
         {} ORDER BY a.timestamp DESC LIMIT 100",
        where_clause
    );

    let mut rows_query = sqlx::query_as::<_, HistoryRow>(&sql);
    for b in &bindings {
        rows_query = rows_query.bind(b);
    }

    let rows = rows_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch attendance history");
        actix_web::error::ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

fn parse_month_filter(raw: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    }
    .and_hms_opt(0, 0, 0)?;
    Some((start, end))
}

/// Administrative override: rewrites any subset of an event's fields with
/// no invariant re-validation. This is the documented escape hatch, kept
/// apart from the checked append path on purpose.
#[utoipa::path(
    put,
    path = "/api/attendance/{event_id}",
    params(("event_id", description = "Attendance event ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Event updated"),
        (status = 404, description = "Event not found"),
        (status = 403, description = "Admin only"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn override_event(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let event_id = path.into_inner();
    let update = build_update_sql("attendance", &body, "id", event_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| {
            error!(error = %e, event_id, "Failed to override attendance event");
            actix_web::error::ErrorInternalServerError("Database error")
        })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Attendance event not found"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Attendance event updated"
    })))
}

#[cfg(test)]
mod tests {
    use super::parse_month_filter;

    #[test]
    fn month_filter_spans_the_whole_month() {
        let (start, end) = parse_month_filter("2026-01").unwrap();
        assert_eq!(start.to_string(), "2026-01-01 00:00:00");
        assert_eq!(end.to_string(), "2026-02-01 00:00:00");

        let (_, end) = parse_month_filter("2025-12").unwrap();
        assert_eq!(end.to_string(), "2026-01-01 00:00:00");
    }

    #[test]
    fn malformed_month_filters_are_dropped() {
        assert!(parse_month_filter("2026").is_none());
        assert!(parse_month_filter("2026-13").is_none());
        assert!(parse_month_filter("abcd-ef").is_none());
    }
}
