use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::payroll::{
    MonthlySalaryTotal, PayrollRow, RosterEntry, SalaryBreakdown, calculate_employee_salary,
    days_in_month, payroll_table, salary_report, sundays_in_month,
};
use crate::core::store::MySqlAttendanceStore;
use crate::error::AppError;
use crate::model::activity;
use crate::model::department::Department;
use crate::model::employee::Employee;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    /// Month number, 1-12. Malformed values fall back to the current month.
    pub month: Option<String>,

    /// Calendar year. Malformed values fall back to the current year.
    pub year: Option<String>,
}

/// Malformed or missing month/year degrade to the current month rather
/// than failing the request.
pub(crate) fn resolve_month_year(month: Option<&str>, year: Option<&str>) -> (u32, i32) {
    let today = chrono::Local::now().date_naive();
    let month = month
        .and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(today.month());
    let year = year
        .and_then(|y| y.trim().parse::<i32>().ok())
        .filter(|y| (1970..=9999).contains(y))
        .unwrap_or(today.year());
    (month, year)
}

pub(crate) async fn load_employees(pool: &MySqlPool) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY id ASC")
    .fetch_all(pool)
    .await
}

async fn load_roster(pool: &MySqlPool) -> Result<Vec<RosterEntry>, sqlx::Error> {
    let employees = load_employees(pool).await?;
    let departments =
        sqlx::query_as::<_, Department>("SELECT id, name, note FROM departments")
            .fetch_all(pool)
            .await?;
    let by_id: HashMap<u64, String> = departments.into_iter().map(|d| (d.id, d.name)).collect();

    Ok(employees
        .into_iter()
        .map(|employee| {
            let department = employee.department_id.and_then(|id| by_id.get(&id).cloned());
            RosterEntry {
                employee,
                department,
            }
        })
        .collect())
}

#[derive(Serialize, ToSchema)]
pub struct PayrollTableResponse {
    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 31)]
    pub num_days: u32,

    /// Day numbers that fall on a Sunday, for double-pay highlighting.
    pub sundays: Vec<u32>,

    pub rows: Vec<PayrollRow>,
}

/// Monthly payroll table for the whole roster.
#[utoipa::path(
    get,
    path = "/api/payroll",
    params(MonthQuery),
    responses(
        (status = 200, description = "Payroll table", body = PayrollTableResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn monthly_table(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let (month, year) = resolve_month_year(query.month.as_deref(), query.year.as_deref());

    let roster = load_roster(pool.get_ref()).await?;
    let rows = payroll_table(store.get_ref(), &roster, month, year).await?;

    Ok(HttpResponse::Ok().json(PayrollTableResponse {
        month,
        year,
        num_days: days_in_month(month, year),
        sundays: sundays_in_month(month, year),
        rows,
    }))
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeSalaryResponse {
    #[schema(example = 7)]
    pub employee_id: u64,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    #[serde(flatten)]
    pub breakdown: SalaryBreakdown,
}

/// Salary breakdown for one employee. Uses the fixed 26-day divisor; see
/// the payroll table for the per-month figure.
#[utoipa::path(
    get,
    path = "/api/payroll/employee/{employee_id}",
    params(
        ("employee_id", description = "Employee ID"),
        MonthQuery
    ),
    responses(
        (status = 200, description = "Salary breakdown", body = EmployeeSalaryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn employee_salary(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
    path: web::Path<u64>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    let (month, year) = resolve_month_year(query.month.as_deref(), query.year.as_deref());

    // An unknown employee yields the zeroed breakdown, same as one with no
    // salary configured.
    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let breakdown =
        calculate_employee_salary(store.get_ref(), employee.as_ref(), month, year).await?;

    Ok(HttpResponse::Ok().json(EmployeeSalaryResponse {
        employee_id,
        month,
        year,
        breakdown,
    }))
}

#[derive(Serialize, ToSchema)]
pub struct SalaryReportResponse {
    pub months: Vec<MonthlySalaryTotal>,
}

/// Roster totals for the trailing 12 months, oldest first.
#[utoipa::path(
    get,
    path = "/api/payroll/report",
    responses(
        (status = 200, description = "Trailing 12-month totals", body = SalaryReportResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn report(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    store: web::Data<MySqlAttendanceStore>,
) -> Result<HttpResponse, AppError> {
    let today = chrono::Local::now().date_naive();
    let employees = load_employees(pool.get_ref()).await?;

    let months = salary_report(
        store.get_ref(),
        &employees,
        today.month(),
        today.year(),
        12,
    )
    .await?;

    Ok(HttpResponse::Ok().json(SalaryReportResponse { months }))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateWorkdays {
    #[schema(example = 7)]
    pub employee_id: u64,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,

    /// Days of the month to mark fully worked; every other day of the
    /// month is cleared.
    #[schema(example = json!([2, 3, 4, 5, 6]))]
    pub worked_days: Vec<u32>,
}

/// Administrative month rewrite: replaces the employee's events for the
/// month with a synthetic 08:00 IN / 17:00 OUT pair on each selected day.
/// Runs in one transaction; either the whole month is rewritten or none
/// of it.
#[utoipa::path(
    post,
    path = "/api/payroll/days",
    request_body = UpdateWorkdays,
    responses(
        (status = 200, description = "Workdays rewritten"),
        (status = 404, description = "Employee not found"),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_workdays(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpdateWorkdays>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let num_days = days_in_month(payload.month, payload.year);
    if num_days == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Invalid month or year"
        })));
    }

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
        .bind(payload.employee_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up employee");
            ErrorInternalServerError("Database error")
        })?;
    if exists == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Database error")
    })?;

    let rewrite = async {
        for day in 1..=num_days {
            let Some(date) = NaiveDate::from_ymd_opt(payload.year, payload.month, day) else {
                continue;
            };

            sqlx::query("DELETE FROM attendance WHERE employee_id = ? AND date = ?")
                .bind(payload.employee_id)
                .bind(date)
                .execute(&mut *tx)
                .await?;

            if !payload.worked_days.contains(&day) {
                continue;
            }

            for (kind, hour) in [("IN", 8u32), ("OUT", 17u32)] {
                let Some(ts) = date.and_hms_opt(hour, 0, 0) else {
                    continue;
                };
                sqlx::query(
                    "INSERT INTO attendance (employee_id, date, timestamp, kind) VALUES (?, ?, ?, ?)",
                )
                .bind(payload.employee_id)
                .bind(date)
                .bind(ts)
                .bind(kind)
                .execute(&mut *tx)
                .await?;
            }
        }
        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = rewrite {
        error!(error = %e, employee_id = payload.employee_id, "Failed to rewrite workdays");
        tx.rollback().await.ok();
        return Ok(HttpResponse::InternalServerError().json(json!({
            "message": "Failed to rewrite workdays"
        })));
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit workday rewrite");
        ErrorInternalServerError("Database error")
    })?;

    activity::record(
        pool.get_ref(),
        payload.employee_id,
        &format!("Updated workdays {}/{}", payload.month, payload.year),
        &format!("{} days marked worked", payload.worked_days.len()),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Workdays updated successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::resolve_month_year;
    use chrono::Datelike;

    #[test]
    fn valid_month_and_year_pass_through() {
        assert_eq!(resolve_month_year(Some("6"), Some("2025")), (6, 2025));
        assert_eq!(resolve_month_year(Some(" 12 "), Some("1999")), (12, 1999));
    }

    #[test]
    fn malformed_input_falls_back_to_today() {
        let today = chrono::Local::now().date_naive();
        assert_eq!(
            resolve_month_year(Some("13"), Some("abc")),
            (today.month(), today.year())
        );
        assert_eq!(
            resolve_month_year(None, None),
            (today.month(), today.year())
        );
        assert_eq!(
            resolve_month_year(Some("0"), Some("2025")),
            (today.month(), 2025)
        );
    }
}
