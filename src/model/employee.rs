use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How `base_salary` is to be read when deriving a daily wage for overtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, strum::Display)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SalaryBasis {
    Monthly,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP20260115083000",
        "full_name": "Jane Doe",
        "email": "jane.doe@company.com",
        "phone": "+84901234567",
        "department_id": 2,
        "position": "Accountant",
        "base_salary": "9000000",
        "salary_basis": "monthly",
        "hire_date": "2024-03-01",
        "active": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP20260115083000")]
    pub employee_code: String,

    #[schema(example = "Jane Doe")]
    pub full_name: String,

    #[schema(example = "jane.doe@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "+84901234567", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,

    #[schema(example = "9000000", value_type = String)]
    pub base_salary: Decimal,

    pub salary_basis: SalaryBasis,

    #[schema(example = "2024-03-01", value_type = String, format = "date", nullable = true)]
    pub hire_date: Option<NaiveDate>,

    pub active: bool,

    #[schema(nullable = true)]
    pub image: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}
