use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::error::AppError;
use crate::model::attendance::{AttendanceEvent, EventKind};

/// A not-yet-persisted check event. The calendar day is derived from the
/// timestamp at append time.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub employee_id: u64,
    pub timestamp: NaiveDateTime,
    pub kind: EventKind,
    pub image: Option<String>,
    pub late_minutes: i32,
    pub late_penalty: Decimal,
    pub overtime_minutes: i32,
    pub overtime_pay: Decimal,
}

impl NewEvent {
    pub fn check_in(
        employee_id: u64,
        timestamp: NaiveDateTime,
        image: Option<String>,
        late_minutes: i32,
        late_penalty: Decimal,
    ) -> Self {
        Self {
            employee_id,
            timestamp,
            kind: EventKind::In,
            image,
            late_minutes,
            late_penalty,
            overtime_minutes: 0,
            overtime_pay: Decimal::ZERO,
        }
    }

    pub fn check_out(
        employee_id: u64,
        timestamp: NaiveDateTime,
        image: Option<String>,
        overtime_minutes: i32,
        overtime_pay: Decimal,
    ) -> Self {
        Self {
            employee_id,
            timestamp,
            kind: EventKind::Out,
            image,
            late_minutes: 0,
            late_penalty: Decimal::ZERO,
            overtime_minutes,
            overtime_pay,
        }
    }
}

/// At most one event of each kind can exist for an (employee, day).
#[derive(Debug, Default, Clone)]
pub struct DayEvents {
    pub check_in: Option<AttendanceEvent>,
    pub check_out: Option<AttendanceEvent>,
}

fn collect_day(rows: Vec<AttendanceEvent>) -> DayEvents {
    let mut day = DayEvents::default();
    for row in rows {
        match row.kind {
            EventKind::In => day.check_in.get_or_insert(row),
            EventKind::Out => day.check_out.get_or_insert(row),
        };
    }
    day
}

/// Repository of immutable check events. `append` must be atomic with
/// respect to the existing-events check for the event's (employee, day);
/// `range` returns rows ordered by timestamp, ties broken by id.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_day(&self, employee_id: u64, day: NaiveDate) -> Result<DayEvents, AppError>;

    async fn append(&self, event: NewEvent) -> Result<AttendanceEvent, AppError>;

    async fn range(
        &self,
        employee_id: Option<u64>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AttendanceEvent>, AppError>;
}

const SELECT_COLUMNS: &str = "id, employee_id, date, timestamp, kind, image, \
     late_minutes, late_penalty, overtime_minutes, overtime_pay";

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn find_day(&self, employee_id: u64, day: NaiveDate) -> Result<DayEvents, AppError> {
        let rows = sqlx::query_as::<_, AttendanceEvent>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND date = ? \
             ORDER BY timestamp ASC, id ASC"
        ))
        .bind(employee_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_day(rows))
    }

    async fn append(&self, event: NewEvent) -> Result<AttendanceEvent, AppError> {
        let day = event.timestamp.date();

        // Check-then-insert runs under a row lock; the unique key on
        // (employee_id, date, kind) backs it up if two appends race on a
        // day that had no rows to lock yet.
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, AttendanceEvent>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND date = ? FOR UPDATE"
        ))
        .bind(event.employee_id)
        .bind(day)
        .fetch_all(&mut *tx)
        .await?;
        let existing = collect_day(existing);

        match event.kind {
            EventKind::In if existing.check_in.is_some() => {
                tx.rollback().await.ok();
                return Err(AppError::DuplicateEventKind(EventKind::In));
            }
            EventKind::Out if existing.check_out.is_some() => {
                tx.rollback().await.ok();
                return Err(AppError::DuplicateEventKind(EventKind::Out));
            }
            EventKind::Out if existing.check_in.is_none() => {
                tx.rollback().await.ok();
                return Err(AppError::OutBeforeIn);
            }
            _ => {}
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance
            (employee_id, date, timestamp, kind, image, late_minutes, late_penalty, overtime_minutes, overtime_pay)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.employee_id)
        .bind(day)
        .bind(event.timestamp)
        .bind(event.kind)
        .bind(&event.image)
        .bind(event.late_minutes)
        .bind(event.late_penalty)
        .bind(event.overtime_minutes)
        .bind(event.overtime_pay)
        .execute(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(r) => r,
            Err(e) => {
                tx.rollback().await.ok();
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Err(AppError::DuplicateEventKind(event.kind));
                    }
                }
                return Err(e.into());
            }
        };

        let id = inserted.last_insert_id();
        tx.commit().await?;

        Ok(AttendanceEvent {
            id,
            employee_id: event.employee_id,
            date: day,
            timestamp: event.timestamp,
            kind: event.kind,
            image: event.image,
            late_minutes: event.late_minutes,
            late_penalty: event.late_penalty,
            overtime_minutes: event.overtime_minutes,
            overtime_pay: event.overtime_pay,
        })
    }

    async fn range(
        &self,
        employee_id: Option<u64>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AttendanceEvent>, AppError> {
        let rows = match employee_id {
            Some(id) => {
                sqlx::query_as::<_, AttendanceEvent>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM attendance \
                     WHERE employee_id = ? AND timestamp BETWEEN ? AND ? \
                     ORDER BY timestamp ASC, id ASC"
                ))
                .bind(id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, AttendanceEvent>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM attendance \
                     WHERE timestamp BETWEEN ? AND ? \
                     ORDER BY timestamp ASC, id ASC"
                ))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// Store double for engine tests, enforcing the same append rules as
    /// the MySQL implementation under a single lock.
    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Vec<AttendanceEvent>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<AttendanceEvent> {
            self.inner.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AttendanceStore for MemoryStore {
        async fn find_day(&self, employee_id: u64, day: NaiveDate) -> Result<DayEvents, AppError> {
            let rows = self.inner.lock().unwrap();
            let mut matching: Vec<AttendanceEvent> = rows
                .iter()
                .filter(|e| e.employee_id == employee_id && e.date == day)
                .cloned()
                .collect();
            matching.sort_by_key(|e| (e.timestamp, e.id));
            Ok(collect_day(matching))
        }

        async fn append(&self, event: NewEvent) -> Result<AttendanceEvent, AppError> {
            let day = event.timestamp.date();
            let mut rows = self.inner.lock().unwrap();

            let has_kind = |kind: EventKind| {
                rows.iter()
                    .any(|e| e.employee_id == event.employee_id && e.date == day && e.kind == kind)
            };

            match event.kind {
                EventKind::In if has_kind(EventKind::In) => {
                    return Err(AppError::DuplicateEventKind(EventKind::In));
                }
                EventKind::Out if has_kind(EventKind::Out) => {
                    return Err(AppError::DuplicateEventKind(EventKind::Out));
                }
                EventKind::Out if !has_kind(EventKind::In) => {
                    return Err(AppError::OutBeforeIn);
                }
                _ => {}
            }

            let stored = AttendanceEvent {
                id: rows.len() as u64 + 1,
                employee_id: event.employee_id,
                date: day,
                timestamp: event.timestamp,
                kind: event.kind,
                image: event.image,
                late_minutes: event.late_minutes,
                late_penalty: event.late_penalty,
                overtime_minutes: event.overtime_minutes,
                overtime_pay: event.overtime_pay,
            };
            rows.push(stored.clone());
            Ok(stored)
        }

        async fn range(
            &self,
            employee_id: Option<u64>,
            start: NaiveDateTime,
            end: NaiveDateTime,
        ) -> Result<Vec<AttendanceEvent>, AppError> {
            let rows = self.inner.lock().unwrap();
            let mut matching: Vec<AttendanceEvent> = rows
                .iter()
                .filter(|e| {
                    employee_id.map_or(true, |id| e.employee_id == id)
                        && e.timestamp >= start
                        && e.timestamp <= end
                })
                .cloned()
                .collect();
            matching.sort_by_key(|e| (e.timestamp, e.id));
            Ok(matching)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn event(kind: EventKind, day: u32, h: u32, m: u32) -> NewEvent {
        NewEvent {
            employee_id: 1,
            timestamp: ts(day, h, m),
            kind,
            image: None,
            late_minutes: 0,
            late_penalty: Decimal::ZERO,
            overtime_minutes: 0,
            overtime_pay: Decimal::ZERO,
        }
    }

    #[actix_web::test]
    async fn second_check_in_fails_and_leaves_state_unchanged() {
        let store = MemoryStore::new();
        store.append(event(EventKind::In, 5, 8, 0)).await.unwrap();

        let err = store.append(event(EventKind::In, 5, 9, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEventKind(EventKind::In)));

        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, ts(5, 8, 0));
    }

    #[actix_web::test]
    async fn check_out_without_check_in_is_rejected() {
        let store = MemoryStore::new();
        let err = store.append(event(EventKind::Out, 5, 18, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::OutBeforeIn));
        assert!(store.events().is_empty());
    }

    #[actix_web::test]
    async fn same_kind_on_another_day_is_independent() {
        let store = MemoryStore::new();
        store.append(event(EventKind::In, 5, 8, 0)).await.unwrap();
        store.append(event(EventKind::In, 6, 8, 0)).await.unwrap();
        assert_eq!(store.events().len(), 2);
    }

    #[actix_web::test]
    async fn range_orders_by_timestamp_then_id() {
        let store = MemoryStore::new();
        store.append(event(EventKind::In, 5, 8, 0)).await.unwrap();
        store.append(event(EventKind::Out, 5, 18, 0)).await.unwrap();
        // Same timestamp as employee 1's check-in, later id.
        store
            .append(NewEvent {
                employee_id: 2,
                ..event(EventKind::In, 5, 8, 0)
            })
            .await
            .unwrap();

        let rows = store
            .range(None, ts(5, 0, 0), ts(5, 23, 59))
            .await
            .unwrap();
        let ids: Vec<u64> = rows.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        let mine = store
            .range(Some(1), ts(5, 0, 0), ts(5, 23, 59))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
    }
}
