use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::{
    analytics::AttendanceSummary,
    api::internal,
    auth::auth::AuthUser,
    db::Store,
    model::{attendance::Attendance, employee::Employee},
    utils::pagination::PageRequest,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Page number (start with 1)
    pub page: Option<u32>,
    /// Items per page
    pub per_page: Option<u32>,
    /// Exact department name, case-insensitive
    pub department: Option<String>,
    /// Search by name, email or employee code
    pub search: Option<String>,
}

/// The caller's own record with attendance figures for the profile page.
#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub employee: Employee,
    pub attendance: AttendanceSummary,
}

/// Profile of the logged-in employee
#[utoipa::path(
    get,
    path = "/api/employee/me",
    responses(
        (status = 200, description = "Own profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "Employee record missing")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_profile(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;

    let Some(employee) = store
        .employees
        .fetch_by_id(employee_id)
        .map_err(internal("Failed to fetch employee"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    let records = store
        .attendance
        .fetch_by_filter(&|a: &Attendance| a.employee_id == employee_id)
        .map_err(internal("Failed to fetch attendance"))?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        employee,
        attendance: AttendanceSummary::from_records(&records),
    }))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = Object, example = json!({
            "data": [{
                "id": 1,
                "employee_code": "MCD-1001",
                "name": "Rajesh Kumar",
                "email": "rajesh.kumar@mcd.gov.in",
                "role": "employee",
                "department": "Sanitation"
            }],
            "page": 1,
            "per_page": 10,
            "total": 1
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager/HR/Admin only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<Store>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_reviewer()?;

    let page = PageRequest::new(query.page, query.per_page);
    let department = query.department.as_deref().map(str::trim).filter(|d| !d.is_empty());
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    debug!(?department, ?search, "Listing employees");

    let employees = store
        .employees
        .fetch_by_filter(&|e: &Employee| {
            department.is_none_or(|d| e.department.eq_ignore_ascii_case(d))
                && search.is_none_or(|s| e.matches_search(s))
        })
        .map_err(internal("Failed to fetch employees"))?;

    Ok(HttpResponse::Ok().json(page.apply(employees)))
}

#[utoipa::path(
    get,
    path = "/api/employee/{id}",
    params(
        ("id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    if !auth.can_view_employee(employee_id) {
        return Err(actix_web::error::ErrorForbidden("Not your profile"));
    }

    match store
        .employees
        .fetch_by_id(employee_id)
        .map_err(internal("Failed to fetch employee"))?
    {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}
