use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

use crate::api::attendance::{CheckRequest, CheckResponse, HistoryRow};
use crate::api::dashboard::DashboardResponse;
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, GalleryItem, UpdateEmployee,
};
use crate::api::payroll::{
    EmployeeSalaryResponse, PayrollTableResponse, SalaryReportResponse, UpdateWorkdays,
};
use crate::core::payroll::{MonthlySalaryTotal, PayrollRow, SalaryBreakdown};
use crate::model::activity::ActivityView;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::Employee;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Faceclock API",
        version = "1.0.0",
        description = r#"
## Face-recognition attendance & payroll

This API records biometric check-in/check-out events and computes monthly
payroll from them.

### Key features
- **Employee enrollment** with a face embedding per employee
- **Attendance**: one IN and one OUT per employee per day, with late
  penalties and overtime pay computed at check time
- **Payroll**: monthly tables with Sunday double pay, per-employee
  breakdowns, trailing 12-month totals
- **Audit**: recent-activity feed over every computation-triggering event

### Security
Endpoints under the API prefix require **JWT Bearer authentication**.
Mutations are limited to **Admin** (and **HR** where noted).

Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check,
        crate::api::attendance::history,
        crate::api::attendance::override_event,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::gallery_dump,

        crate::api::payroll::monthly_table,
        crate::api::payroll::employee_salary,
        crate::api::payroll::report,
        crate::api::payroll::update_workdays,

        crate::api::dashboard::summary
    ),
    components(
        schemas(
            CheckRequest,
            CheckResponse,
            HistoryRow,
            AttendanceEvent,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            GalleryItem,
            PayrollTableResponse,
            PayrollRow,
            SalaryBreakdown,
            EmployeeSalaryResponse,
            SalaryReportResponse,
            MonthlySalaryTotal,
            UpdateWorkdays,
            DashboardResponse,
            ActivityView
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Biometric check and history APIs"),
        (name = "Employee", description = "Employee enrollment and management APIs"),
        (name = "Payroll", description = "Payroll computation APIs"),
        (name = "Dashboard", description = "Overview APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
