use chrono::NaiveDateTime;

use crate::core::shift;
use crate::core::store::{AttendanceStore, NewEvent};
use crate::error::AppError;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::Employee;

/// What a resolved check produced. Late figures live on the IN event,
/// overtime figures on the OUT event.
#[derive(Debug)]
pub enum CheckOutcome {
    CheckedIn(AttendanceEvent),
    CheckedOut(AttendanceEvent),
}

impl CheckOutcome {
    pub fn event(&self) -> &AttendanceEvent {
        match self {
            CheckOutcome::CheckedIn(e) | CheckOutcome::CheckedOut(e) => e,
        }
    }
}

/// Turn "this employee was identified at `timestamp`" into a validated
/// event. First event of the day is the IN, second the OUT, a third attempt
/// is rejected. The append itself re-validates under the store's lock, so a
/// concurrent duplicate loses there rather than here.
pub async fn resolve_check<S>(
    store: &S,
    employee: &Employee,
    timestamp: NaiveDateTime,
    image: Option<String>,
) -> Result<CheckOutcome, AppError>
where
    S: AttendanceStore + ?Sized,
{
    let day = store.find_day(employee.id, timestamp.date()).await?;

    match (&day.check_in, &day.check_out) {
        (Some(_), Some(_)) => Err(AppError::AttendanceAlreadyComplete),
        (Some(_), None) => {
            let minutes = shift::overtime_minutes(timestamp);
            let pay = shift::overtime_pay(minutes, employee.salary_basis, employee.base_salary);
            let event = store
                .append(NewEvent::check_out(
                    employee.id,
                    timestamp,
                    image,
                    minutes as i32,
                    pay,
                ))
                .await?;
            Ok(CheckOutcome::CheckedOut(event))
        }
        // No IN yet. A lone OUT can only exist after a manual edit; filling
        // in the missing IN keeps the day completable.
        (None, _) => {
            let minutes = shift::late_minutes(timestamp);
            let penalty = shift::late_penalty(minutes);
            let event = store
                .append(NewEvent::check_in(
                    employee.id,
                    timestamp,
                    image,
                    minutes as i32,
                    penalty,
                ))
                .await?;
            Ok(CheckOutcome::CheckedIn(event))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::memory::MemoryStore;
    use crate::model::attendance::EventKind;
    use crate::model::employee::SalaryBasis;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn employee(base: Decimal, basis: SalaryBasis) -> Employee {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Employee {
            id: 7,
            employee_code: "EMP0007".into(),
            full_name: "Jane Doe".into(),
            email: None,
            phone: None,
            department_id: None,
            position: None,
            base_salary: base,
            salary_basis: basis,
            hire_date: Some(day),
            active: true,
            image: None,
            created_at: day.and_hms_opt(9, 0, 0).unwrap(),
            updated_at: day.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 13)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[actix_web::test]
    async fn first_check_of_the_day_is_a_punctual_in() {
        let store = MemoryStore::new();
        let emp = employee(dec!(9_000_000), SalaryBasis::Monthly);

        let outcome = resolve_check(&store, &emp, ts(8, 0), None).await.unwrap();
        let event = match outcome {
            CheckOutcome::CheckedIn(e) => e,
            other => panic!("expected check-in, got {other:?}"),
        };
        assert_eq!(event.kind, EventKind::In);
        assert_eq!(event.late_minutes, 0);
        assert_eq!(event.late_penalty, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn late_check_in_carries_penalty() {
        let store = MemoryStore::new();
        let emp = employee(dec!(9_000_000), SalaryBasis::Monthly);

        let outcome = resolve_check(&store, &emp, ts(8, 15), None).await.unwrap();
        let event = outcome.event();
        assert_eq!(event.late_minutes, 15);
        assert_eq!(event.late_penalty, dec!(50_000));
    }

    #[actix_web::test]
    async fn second_check_is_an_out_with_overtime() {
        let store = MemoryStore::new();
        let emp = employee(dec!(9_000_000), SalaryBasis::Monthly);

        resolve_check(&store, &emp, ts(8, 0), None).await.unwrap();
        let outcome = resolve_check(&store, &emp, ts(19, 0), None).await.unwrap();
        let event = match outcome {
            CheckOutcome::CheckedOut(e) => e,
            other => panic!("expected check-out, got {other:?}"),
        };
        assert_eq!(event.kind, EventKind::Out);
        assert_eq!(event.overtime_minutes, 60);
        // 9,000,000 / 30 / 24 * 1.5
        assert_eq!(event.overtime_pay, dec!(18750.00));
    }

    #[actix_web::test]
    async fn on_time_check_out_earns_no_overtime() {
        let store = MemoryStore::new();
        let emp = employee(dec!(9_000_000), SalaryBasis::Monthly);

        resolve_check(&store, &emp, ts(8, 15), None).await.unwrap();
        let outcome = resolve_check(&store, &emp, ts(18, 0), None).await.unwrap();
        let event = outcome.event();
        assert_eq!(event.overtime_minutes, 0);
        assert_eq!(event.overtime_pay, Decimal::ZERO);
    }

    #[actix_web::test]
    async fn third_check_is_rejected_and_stored_events_survive() {
        let store = MemoryStore::new();
        let emp = employee(dec!(9_000_000), SalaryBasis::Monthly);

        resolve_check(&store, &emp, ts(8, 0), None).await.unwrap();
        resolve_check(&store, &emp, ts(18, 0), None).await.unwrap();

        let err = resolve_check(&store, &emp, ts(18, 30), None).await.unwrap_err();
        assert!(matches!(err, AppError::AttendanceAlreadyComplete));

        let events = store.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, ts(8, 0));
        assert_eq!(events[1].timestamp, ts(18, 0));
    }
}
