use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::store::AttendanceStore;
use crate::error::AppError;
use crate::model::attendance::EventKind;
use crate::model::employee::Employee;

/// The single-employee breakdown always divides by 26, no matter the month.
/// `count_standard_workdays` below recomputes per month. Both divisors are
/// part of the observable contract and stay separate.
pub const FIXED_STANDARD_WORKDAYS: u32 = 26;

pub const WORKED_GLYPH: &str = "✓";
pub const MISSED_GLYPH: &str = "X";

pub fn days_in_month(month: u32, year: i32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match next {
        Some(next) => (next - first).num_days() as u32,
        None => 0,
    }
}

fn month_days(month: u32, year: i32) -> Vec<NaiveDate> {
    (1..=days_in_month(month, year))
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .collect()
}

/// Inclusive wall-clock span covering the whole month.
pub fn month_span(month: u32, year: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let days = days_in_month(month, year);
    if days == 0 {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let last = NaiveDate::from_ymd_opt(year, month, days)?.and_hms_opt(23, 59, 59)?;
    Some((first, last))
}

/// Number of non-Sunday days in the month. Saturday is a workday; only
/// Sunday is excluded.
pub fn count_standard_workdays(month: u32, year: i32) -> u32 {
    month_days(month, year)
        .iter()
        .filter(|d| d.weekday() != Weekday::Sun)
        .count() as u32
}

pub fn sundays_in_month(month: u32, year: i32) -> Vec<u32> {
    month_days(month, year)
        .iter()
        .filter(|d| d.weekday() == Weekday::Sun)
        .map(|d| d.day())
        .collect()
}

/// Days of the month with both an IN and an OUT, gathered from a single
/// range query rather than per-day point lookups.
async fn worked_days<S>(
    store: &S,
    employee_id: u64,
    month: u32,
    year: i32,
) -> Result<HashSet<NaiveDate>, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let Some((start, end)) = month_span(month, year) else {
        return Ok(HashSet::new());
    };
    let events = store.range(Some(employee_id), start, end).await?;

    let mut ins = HashSet::new();
    let mut outs = HashSet::new();
    for event in events {
        match event.kind {
            EventKind::In => ins.insert(event.date),
            EventKind::Out => outs.insert(event.date),
        };
    }
    Ok(ins.intersection(&outs).copied().collect())
}

/// Count of days where both an IN and an OUT exist, regardless of weekday.
pub async fn count_actual_workdays<S>(
    store: &S,
    employee_id: u64,
    month: u32,
    year: i32,
) -> Result<u32, AppError>
where
    S: AttendanceStore + ?Sized,
{
    Ok(worked_days(store, employee_id, month, year).await?.len() as u32)
}

/// Gross salary for one employee with the per-month divisor: every fully
/// attended day earns `base / standard_workdays(month)`, doubled on
/// Sundays, and nothing otherwise. A month with zero standard workdays
/// yields zero rather than dividing by it.
pub async fn employee_gross<S>(
    store: &S,
    employee: &Employee,
    month: u32,
    year: i32,
) -> Result<Decimal, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let standard = count_standard_workdays(month, year);
    if standard == 0 || employee.base_salary <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let daily = employee.base_salary / Decimal::from(standard);
    let worked = worked_days(store, employee.id, month, year).await?;

    let mut total = Decimal::ZERO;
    for day in month_days(month, year) {
        if !worked.contains(&day) {
            continue;
        }
        total += if day.weekday() == Weekday::Sun {
            daily * dec!(2)
        } else {
            daily
        };
    }
    Ok(total)
}

/// Month total across the roster. Employees with no positive base salary
/// are skipped entirely, not counted as zero. Per-employee sums are
/// independent, so they run concurrently.
pub async fn calculate_salary<S>(
    store: &S,
    employees: &[Employee],
    month: u32,
    year: i32,
) -> Result<Decimal, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let grosses = try_join_all(
        employees
            .iter()
            .filter(|e| e.base_salary > Decimal::ZERO)
            .map(|e| employee_gross(store, e, month, year)),
    )
    .await?;
    Ok(grosses.into_iter().sum())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalaryBreakdown {
    #[schema(example = 26)]
    pub workdays_standard: u32,

    #[schema(example = 21)]
    pub workdays_actual: u32,

    #[schema(example = "9000000", value_type = String)]
    pub base_salary: Decimal,

    #[schema(example = "346153.85", value_type = String)]
    pub daily_salary: Decimal,

    #[schema(example = "7269230.77", value_type = String)]
    pub salary: Decimal,
}

/// Per-employee breakdown with the fixed 26-day divisor. Deliberately not
/// the same figure `calculate_salary` produces for the same employee and
/// month; callers observe both paths independently.
pub async fn calculate_employee_salary<S>(
    store: &S,
    employee: Option<&Employee>,
    month: u32,
    year: i32,
) -> Result<SalaryBreakdown, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let Some(employee) = employee.filter(|e| e.base_salary > Decimal::ZERO) else {
        return Ok(SalaryBreakdown {
            workdays_standard: FIXED_STANDARD_WORKDAYS,
            workdays_actual: 0,
            base_salary: Decimal::ZERO,
            daily_salary: Decimal::ZERO,
            salary: Decimal::ZERO,
        });
    };

    let actual = count_actual_workdays(store, employee.id, month, year).await?;
    let daily = employee.base_salary / Decimal::from(FIXED_STANDARD_WORKDAYS);

    Ok(SalaryBreakdown {
        workdays_standard: FIXED_STANDARD_WORKDAYS,
        workdays_actual: actual,
        base_salary: employee.base_salary,
        daily_salary: daily,
        salary: daily * Decimal::from(actual),
    })
}

/// Roster entry for the payroll table; the department name is resolved by
/// the caller.
pub struct RosterEntry {
    pub employee: Employee,
    pub department: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayrollRow {
    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "Accounting", nullable = true)]
    pub department: Option<String>,

    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,

    /// One glyph per calendar day: "✓" fully attended, "X" otherwise.
    pub days: Vec<String>,

    #[schema(example = "360000", value_type = String)]
    pub total_salary: Decimal,
}

async fn payroll_row<S>(
    store: &S,
    entry: &RosterEntry,
    month: u32,
    year: i32,
) -> Result<PayrollRow, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let standard = count_standard_workdays(month, year);
    let daily = if entry.employee.base_salary > Decimal::ZERO && standard > 0 {
        entry.employee.base_salary / Decimal::from(standard)
    } else {
        Decimal::ZERO
    };
    let worked = worked_days(store, entry.employee.id, month, year).await?;

    let mut days = Vec::with_capacity(days_in_month(month, year) as usize);
    let mut total = Decimal::ZERO;
    for day in month_days(month, year) {
        if worked.contains(&day) {
            days.push(WORKED_GLYPH.to_string());
            total += if day.weekday() == Weekday::Sun {
                daily * dec!(2)
            } else {
                daily
            };
        } else {
            days.push(MISSED_GLYPH.to_string());
        }
    }

    Ok(PayrollRow {
        name: entry.employee.full_name.clone(),
        department: entry.department.clone(),
        position: entry.employee.position.clone(),
        days,
        total_salary: total,
    })
}

/// The full monthly table, all employees included (salaryless ones show
/// their glyphs with a zero total).
pub async fn payroll_table<S>(
    store: &S,
    roster: &[RosterEntry],
    month: u32,
    year: i32,
) -> Result<Vec<PayrollRow>, AppError>
where
    S: AttendanceStore + ?Sized,
{
    try_join_all(roster.iter().map(|e| payroll_row(store, e, month, year))).await
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlySalaryTotal {
    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = "27360000", value_type = String)]
    pub total: Decimal,
}

/// Roster totals for the `months` ending at (month, year), oldest first.
pub async fn salary_report<S>(
    store: &S,
    employees: &[Employee],
    month: u32,
    year: i32,
    months: u32,
) -> Result<Vec<MonthlySalaryTotal>, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let mut points = Vec::with_capacity(months as usize);
    let (mut m, mut y) = (month, year);
    for _ in 0..months {
        points.push((m, y));
        (m, y) = if m == 1 { (12, y - 1) } else { (m - 1, y) };
    }
    points.reverse();

    let totals = try_join_all(
        points
            .iter()
            .map(|&(m, y)| calculate_salary(store, employees, m, y)),
    )
    .await?;

    Ok(points
        .into_iter()
        .zip(totals)
        .map(|((m, y), total)| MonthlySalaryTotal {
            year: y,
            month: m,
            total,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::resolve_check;
    use crate::core::store::memory::MemoryStore;
    use crate::model::employee::SalaryBasis;

    fn employee(id: u64, base: Decimal) -> Employee {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Employee {
            id,
            employee_code: format!("EMP{id:04}"),
            full_name: format!("Employee {id}"),
            email: None,
            phone: None,
            department_id: None,
            position: None,
            base_salary: base,
            salary_basis: SalaryBasis::Monthly,
            hire_date: Some(day),
            active: true,
            image: None,
            created_at: day.and_hms_opt(9, 0, 0).unwrap(),
            updated_at: day.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    async fn work_full_day(store: &MemoryStore, emp: &Employee, date: NaiveDate) {
        resolve_check(store, emp, date.and_hms_opt(8, 0, 0).unwrap(), None)
            .await
            .unwrap();
        resolve_check(store, emp, date.and_hms_opt(18, 0, 0).unwrap(), None)
            .await
            .unwrap();
    }

    #[test]
    fn standard_workdays_exclude_only_sundays() {
        // June 2025 starts on a Sunday: 5 Sundays, 25 workdays.
        assert_eq!(count_standard_workdays(6, 2025), 25);
        // February 2026 starts on a Sunday: 4 Sundays, 24 workdays.
        assert_eq!(count_standard_workdays(2, 2026), 24);
        assert_eq!(sundays_in_month(6, 2025), vec![1, 8, 15, 22, 29]);
    }

    #[test]
    fn invalid_months_collapse_to_empty() {
        assert_eq!(days_in_month(13, 2025), 0);
        assert_eq!(count_standard_workdays(0, 2025), 0);
        assert!(month_span(13, 2025).is_none());
    }

    #[actix_web::test]
    async fn single_weekday_contributes_one_daily_wage() {
        // Scenario: 9,000,000 monthly, late check-in 08:15 and 18:00 out on
        // Tuesday June 10th, nothing else that month.
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

        let outcome = resolve_check(
            &store,
            &emp,
            tuesday.and_hms_opt(8, 15, 0).unwrap(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.event().late_minutes, 15);
        assert_eq!(outcome.event().late_penalty, dec!(50_000));
        resolve_check(&store, &emp, tuesday.and_hms_opt(18, 0, 0).unwrap(), None)
            .await
            .unwrap();

        let gross = employee_gross(&store, &emp, 6, 2025).await.unwrap();
        assert_eq!(gross, dec!(360_000)); // 9,000,000 / 25
    }

    #[actix_web::test]
    async fn sunday_pays_double() {
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();
        work_full_day(&store, &emp, sunday).await;

        let gross = employee_gross(&store, &emp, 6, 2025).await.unwrap();
        assert_eq!(gross, dec!(720_000));

        // The Sunday multiplier does not inflate the actual-workday count.
        assert_eq!(count_actual_workdays(&store, 1, 6, 2025).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn half_attended_day_earns_nothing() {
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        resolve_check(&store, &emp, day.and_hms_opt(8, 0, 0).unwrap(), None)
            .await
            .unwrap();

        assert_eq!(
            employee_gross(&store, &emp, 6, 2025).await.unwrap(),
            Decimal::ZERO
        );
        assert_eq!(count_actual_workdays(&store, 1, 6, 2025).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn gross_equals_sum_of_day_contributions() {
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let worked = [3u32, 8, 10, 14, 21]; // June 8th is a Sunday
        for d in worked {
            work_full_day(&store, &emp, NaiveDate::from_ymd_opt(2025, 6, d).unwrap()).await;
        }

        let daily = dec!(9_000_000) / Decimal::from(25u32);
        let expected = daily * dec!(4) + daily * dec!(2);
        assert_eq!(
            employee_gross(&store, &emp, 6, 2025).await.unwrap(),
            expected
        );
    }

    #[actix_web::test]
    async fn roster_total_skips_salaryless_employees() {
        let store = MemoryStore::new();
        let paid = employee(1, dec!(9_000_000));
        let unpaid = employee(2, Decimal::ZERO);
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        work_full_day(&store, &paid, day).await;
        work_full_day(&store, &unpaid, day).await;

        let total = calculate_salary(&store, &[paid, unpaid], 6, 2025)
            .await
            .unwrap();
        assert_eq!(total, dec!(360_000));
    }

    #[actix_web::test]
    async fn breakdown_fixes_standard_workdays_at_26() {
        // The single-employee breakdown and the roster total legitimately
        // disagree: 26 vs the month's real workday count.
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        work_full_day(&store, &emp, day).await;

        let breakdown = calculate_employee_salary(&store, Some(&emp), 6, 2025)
            .await
            .unwrap();
        assert_eq!(breakdown.workdays_standard, 26);
        assert_eq!(breakdown.workdays_actual, 1);
        assert_eq!(breakdown.daily_salary, dec!(9_000_000) / dec!(26));
        assert_eq!(breakdown.salary, dec!(9_000_000) / dec!(26));

        let total = calculate_salary(&store, std::slice::from_ref(&emp), 6, 2025)
            .await
            .unwrap();
        assert_eq!(total, dec!(360_000));
        assert_ne!(breakdown.salary, total);
    }

    #[actix_web::test]
    async fn missing_employee_gets_a_zeroed_breakdown() {
        let store = MemoryStore::new();
        let breakdown = calculate_employee_salary(&store, None, 6, 2025)
            .await
            .unwrap();
        assert_eq!(breakdown.workdays_standard, 26);
        assert_eq!(breakdown.workdays_actual, 0);
        assert_eq!(breakdown.salary, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn payroll_rows_carry_day_glyphs() {
        let store = MemoryStore::new();
        let emp = employee(1, dec!(9_000_000));
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        work_full_day(&store, &emp, day).await;

        let roster = [RosterEntry {
            employee: emp,
            department: Some("Accounting".into()),
        }];
        let rows = payroll_table(&store, &roster, 6, 2025).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].days.len(), 30);
        assert_eq!(rows[0].days[9], WORKED_GLYPH);
        assert_eq!(rows[0].days[0], MISSED_GLYPH);
        assert_eq!(rows[0].total_salary, dec!(360_000));
    }

    #[actix_web::test]
    async fn report_walks_back_across_the_year_boundary() {
        let store = MemoryStore::new();
        let report = salary_report(&store, &[], 2, 2026, 12).await.unwrap();
        assert_eq!(report.len(), 12);
        assert_eq!((report[0].year, report[0].month), (2025, 3));
        assert_eq!((report[11].year, report[11].month), (2026, 2));
        assert!(report.iter().all(|p| p.total == Decimal::ZERO));
    }
}
