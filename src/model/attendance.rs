use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a check event opens or closes the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema, strum::Display)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventKind {
    In,
    Out,
}

/// One immutable check event. `late_minutes`/`late_penalty` are meaningful
/// on IN rows, `overtime_minutes`/`overtime_pay` on OUT rows; the other pair
/// stays zero.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEvent {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub employee_id: u64,

    #[schema(example = "2026-01-15", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2026-01-15T08:15:00", value_type = String, format = "date-time")]
    pub timestamp: NaiveDateTime,

    pub kind: EventKind,

    #[schema(nullable = true)]
    pub image: Option<String>,

    #[schema(example = 15)]
    pub late_minutes: i32,

    #[schema(example = "50000", value_type = String)]
    pub late_penalty: Decimal,

    #[schema(example = 0)]
    pub overtime_minutes: i32,

    #[schema(example = "0", value_type = String)]
    pub overtime_pay: Decimal,
}
