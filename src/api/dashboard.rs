use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::payroll::{load_employees, resolve_month_year};
use crate::auth::auth::AuthUser;
use crate::core::payroll::calculate_salary;
use crate::core::store::MySqlAttendanceStore;
use crate::error::AppError;
use crate::model::activity::{self, ActivityView};
use crate::model::employee::Employee;

const RECENT_WINDOW: u32 = 5;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DashboardQuery {
    /// Month filter as `YYYY-MM`; malformed values fall back to today.
    #[param(example = "2026-01")]
    pub month: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(example = 42)]
    pub total_employees: i64,

    /// Employees with a check-in today.
    #[schema(example = 37)]
    pub present_today: i64,

    /// Percentage of the roster present today, rounded.
    #[schema(example = 88)]
    pub attendance_rate: i64,

    #[schema(example = 6)]
    pub total_departments: i64,

    /// Departments that currently have employees.
    #[schema(example = 5)]
    pub active_departments: i64,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    /// Roster payroll total for the selected month.
    #[schema(example = "27360000", value_type = String)]
    pub total_salary: Decimal,

    /// Latest five enrollments.
    pub recent_employees: Vec<Employee>,

    /// Latest five audit entries with relative age labels.
    pub recent_activities: Vec<ActivityView>,
}

/// Overview used by the landing screen.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn summary(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<DashboardQuery>,
) -> Result<HttpResponse, AppError> {
    let pool = pool.get_ref();

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;

    let present_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT employee_id) FROM attendance \
         WHERE date = CURDATE() AND kind = 'IN'",
    )
    .fetch_one(pool)
    .await?;

    let attendance_rate = if total_employees > 0 {
        ((present_today as f64 / total_employees as f64) * 100.0).round() as i64
    } else {
        0
    };

    let total_departments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments")
        .fetch_one(pool)
        .await?;

    let active_departments = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT department_id) FROM employees WHERE department_id IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;

    // The month picker sends "YYYY-MM".
    let (month_part, year_part) = match query.month.as_deref().and_then(|m| m.split_once('-')) {
        Some((y, m)) => (Some(m.to_string()), Some(y.to_string())),
        None => (None, None),
    };
    let (month, year) = resolve_month_year(month_part.as_deref(), year_part.as_deref());

    let employees = load_employees(pool).await?;
    let total_salary = calculate_salary(store.get_ref(), &employees, month, year).await?;

    let recent_employees = {
        let mut latest = employees;
        latest.sort_by(|a, b| b.id.cmp(&a.id));
        latest.truncate(RECENT_WINDOW as usize);
        latest
    };

    let now = chrono::Local::now().naive_local();
    let recent_activities = activity::recent(pool, RECENT_WINDOW, now).await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        total_employees,
        present_today,
        attendance_rate,
        total_departments,
        active_departments,
        month,
        year,
        total_salary,
        recent_employees,
        recent_activities,
    }))
}
