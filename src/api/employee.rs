use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::matcher::GalleryEntry;
use crate::model::activity;
use crate::model::employee::{Employee, SalaryBasis};
use crate::model::face_encoding::{decode_embedding, encode_embedding};
use crate::utils::{employee_cache, gallery};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Jane Doe")]
    pub full_name: String,

    /// Department by name; created on first use.
    #[schema(example = "Accounting", nullable = true)]
    pub department: Option<String>,

    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,

    #[schema(example = "9000000", value_type = String)]
    pub base_salary: Decimal,

    pub salary_basis: Option<SalaryBasis>,

    #[schema(example = "jane.doe@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "+84901234567", nullable = true)]
    pub phone: Option<String>,

    /// Generated from the enrollment time when absent.
    #[schema(example = "EMP20260115083000", nullable = true)]
    pub employee_code: Option<String>,

    #[schema(example = "2026-01-15", value_type = String, format = "date", nullable = true)]
    pub hire_date: Option<NaiveDate>,

    /// Embedding extracted from the enrollment photo by the caller.
    pub embedding: Vec<f64>,

    #[schema(nullable = true)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,

    #[schema(example = 1)]
    pub page: u32,

    #[schema(example = 20)]
    pub per_page: u32,

    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub full_name: Option<String>,

    /// Department by name; created on first use.
    pub department: Option<String>,

    pub position: Option<String>,

    #[schema(value_type = String, nullable = true)]
    pub base_salary: Option<Decimal>,

    pub salary_basis: Option<SalaryBasis>,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub active: Option<bool>,
}

/// Look up a department by name, creating it on first use. The unique name
/// key makes the create path race-safe: a loser re-reads the winner's row.
pub async fn find_or_create_department(
    pool: &MySqlPool,
    name: &str,
) -> Result<u64, sqlx::Error> {
    let existing =
        sqlx::query_scalar::<_, u64>("SELECT id FROM departments WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    match sqlx::query("INSERT INTO departments (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
    {
        Ok(result) => Ok(result.last_insert_id()),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return sqlx::query_scalar::<_, u64>(
                        "SELECT id FROM departments WHERE name = ?",
                    )
                    .bind(name)
                    .fetch_one(pool)
                    .await;
                }
            }
            Err(e)
        }
    }
}

/// Enroll Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee enrolled", body = Object, example = json!({
            "message": "Employee enrolled successfully",
            "id": 7
        })),
        (status = 400, description = "Missing embedding"),
        (status = 409, description = "Employee code already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.embedding.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "An enrollment embedding is required"
        })));
    }

    let department_id = match payload.department.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(name) => Some(
            find_or_create_department(pool.get_ref(), name.trim())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to upsert department");
                    ErrorInternalServerError("Database error")
                })?,
        ),
        None => None,
    };

    let employee_code = payload
        .employee_code
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| {
            format!("EMP{}", chrono::Local::now().format("%Y%m%d%H%M%S"))
        });
    let salary_basis = payload.salary_basis.unwrap_or(SalaryBasis::Monthly);

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, full_name, email, phone, department_id, position, base_salary, salary_basis, hire_date, image)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&employee_code)
    .bind(&payload.full_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(department_id)
    .bind(&payload.position)
    .bind(payload.base_salary)
    .bind(salary_basis)
    .bind(payload.hire_date)
    .bind(&payload.image)
    .execute(pool.get_ref())
    .await;

    let employee_id = match result {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Employee code already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to enroll employee");
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, contact the system admin"
            })));
        }
    };

    sqlx::query("INSERT INTO face_encodings (employee_id, encoding) VALUES (?, ?)")
        .bind(employee_id)
        .bind(encode_embedding(&payload.embedding))
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to store face encoding");
            ErrorInternalServerError("Database error")
        })?;

    gallery::insert(GalleryEntry {
        employee_id,
        embedding: payload.embedding.clone(),
    });

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee enrolled successfully",
        "id": employee_id
    })))
}

/// List employees with optional filters.
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(department_id.to_string());
    }

    if let Some(active) = query.active {
        conditions.push("active = ?");
        bindings.push((active as i64).to_string());
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push("(full_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)");
        let like = format!("%{}%", search.trim());
        bindings.push(like.clone());
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    let data_sql = format!(
        "SELECT * FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch employees");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Database error")
    })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated"),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();

    let current = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Database error")
    })?;

    let Some(current) = current else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    let department_id = match body.department.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(name) => Some(
            find_or_create_department(pool.get_ref(), name.trim())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to upsert department");
                    ErrorInternalServerError("Database error")
                })?,
        ),
        None => current.department_id,
    };

    let full_name = body.full_name.clone().unwrap_or(current.full_name);
    let position = body.position.clone().or(current.position);
    let base_salary = body.base_salary.unwrap_or(current.base_salary);
    let salary_basis = body.salary_basis.unwrap_or(current.salary_basis);
    let email = body.email.clone().or(current.email);
    let phone = body.phone.clone().or(current.phone);
    let active = body.active.unwrap_or(current.active);

    sqlx::query(
        r#"
        UPDATE employees
        SET full_name = ?, department_id = ?, position = ?, base_salary = ?,
            salary_basis = ?, email = ?, phone = ?, active = ?
        WHERE id = ?
        "#,
    )
    .bind(&full_name)
    .bind(department_id)
    .bind(&position)
    .bind(base_salary)
    .bind(salary_basis)
    .bind(&email)
    .bind(&phone)
    .bind(active)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to update employee");
        ErrorInternalServerError("Database error")
    })?;

    employee_cache::invalidate(employee_id).await;
    activity::record(
        pool.get_ref(),
        employee_id,
        "Update Salary",
        &format!("Updated salary: {}", base_salary),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee. Attendance events and gallery embeddings cascade first
/// so no orphaned rows reference the removed employee.
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Database error")
    })?;

    let cascade = async {
        sqlx::query("DELETE FROM attendance WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM face_encodings WHERE employee_id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await
    }
    .await;

    let deleted = match cascade {
        Ok(r) => r.rows_affected(),
        Err(e) => {
            error!(error = %e, employee_id, "Failed to delete employee");
            tx.rollback().await.ok();
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })));
        }
    };

    if deleted == 0 {
        tx.rollback().await.ok();
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit cascade delete");
        ErrorInternalServerError("Database error")
    })?;

    gallery::remove_employee(employee_id);
    employee_cache::invalidate(employee_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[derive(Serialize, ToSchema)]
pub struct GalleryItem {
    pub employee_id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "Accounting")]
    pub department: String,

    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,

    pub encoding: Vec<f64>,
}

/// Gallery dump for realtime recognition clients: every stored encoding
/// with the identity it belongs to, in stored order.
#[utoipa::path(
    get,
    path = "/api/gallery",
    responses(
        (status = 200, description = "Stored encodings", body = [GalleryItem]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn gallery_dump(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let rows = sqlx::query_as::<_, (u64, String, Option<String>, Option<String>, Vec<u8>)>(
        r#"
        SELECT f.employee_id, e.full_name, d.name, e.position, f.encoding
        FROM face_encodings f
        JOIN employees e ON e.id = f.employee_id
        LEFT JOIN departments d ON d.id = e.department_id
        ORDER BY f.id ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch gallery");
        ErrorInternalServerError("Database error")
    })?;

    let items: Vec<GalleryItem> = rows
        .into_iter()
        .filter_map(|(employee_id, name, department, position, blob)| {
            decode_embedding(&blob).map(|encoding| GalleryItem {
                employee_id,
                name,
                department: department.unwrap_or_default(),
                position,
                encoding,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}
