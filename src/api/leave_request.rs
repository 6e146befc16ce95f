use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{internal, require_line_manager},
    auth::auth::AuthUser,
    db::Store,
    model::{
        leave_request::{LeaveRequest, LeaveType},
        request_status::RequestStatus,
    },
    utils::pagination::PageRequest,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "casual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-02-02", format = "date", value_type = String)]
    pub from_date: NaiveDate,
    #[schema(example = "2026-02-03", format = "date", value_type = String)]
    pub to_date: NaiveDate,
    #[schema(example = "Family function")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// Filter by employee ID (reviewers only)
    #[schema(example = 1)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending")]
    #[param(value_type = Option<String>)]
    pub status: Option<RequestStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveSummary {
    pub total: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl LeaveSummary {
    fn of(leaves: &[LeaveRequest]) -> Self {
        let count = |s: RequestStatus| leaves.iter().filter(|l| l.status == s).count();
        Self {
            total: leaves.len(),
            approved: count(RequestStatus::Approved),
            pending: count(RequestStatus::Pending),
            rejected: count(RequestStatus::Rejected),
        }
    }
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Bad request", body = Object, example = json!({
            "message": "from_date cannot be after to_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    store: web::Data<Store>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let payload = payload.into_inner();

    if payload.from_date > payload.to_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from_date cannot be after to_date"
        })));
    }
    if payload.reason.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "reason is required"
        })));
    }

    let leave = store
        .leaves
        .insert(LeaveRequest {
            id: 0,
            employee_id,
            leave_type: payload.leave_type,
            from_date: payload.from_date,
            to_date: payload.to_date,
            reason: payload.reason.trim().to_string(),
            status: RequestStatus::Pending,
            approved_by: None,
            created_at: Utc::now(),
        })
        .map_err(internal("Failed to create leave request"))?;

    info!(employee_id, leave_id = leave.id, days = leave.days(), "Leave requested");
    Ok(HttpResponse::Created().json(leave))
}

async fn decide(
    auth: AuthUser,
    store: web::Data<Store>,
    leave_id: u64,
    status: RequestStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_reviewer()?;

    let pending = store
        .leaves
        .fetch_by_id(leave_id)
        .map_err(internal("Failed to fetch leave request"))?
        .filter(|l| l.status.is_pending());
    let Some(mut leave) = pending else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    };

    if auth.employee_id == Some(leave.employee_id) {
        return Err(actix_web::error::ErrorForbidden(
            "Cannot decide your own leave request",
        ));
    }
    require_line_manager(&auth, &store, leave.employee_id)?;

    leave.status = status;
    leave.approved_by = Some(auth.user_id);
    store
        .leaves
        .update(leave)
        .map_err(internal("Failed to update leave request"))?;

    info!(leave_id, status = %status, by = auth.user_id, "Leave decided");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave {status}")
    })))
}

/* =========================
Approve leave (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, store, path.into_inner(), RequestStatus::Approved).await
}

/* =========================
Reject leave (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, store, path.into_inner(), RequestStatus::Rejected).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = store
        .leaves
        .fetch_by_id(leave_id)
        .map_err(internal("Failed to fetch leave request"))?;

    match leave {
        Some(data) if auth.can_view_employee(data.employee_id) => Ok(HttpResponse::Ok().json(data)),
        Some(_) => Err(actix_web::error::ErrorForbidden("Not your leave request")),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave request not found"
        }))),
    }
}

/// Leave applications, newest first. Employees only see their own.
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = Object, example = json!({
            "data": [{
                "id": 2,
                "employee_id": 1,
                "leave_type": "earned",
                "from_date": "2026-02-16",
                "to_date": "2026-02-20",
                "reason": "Travel to home town",
                "status": "pending",
                "approved_by": null,
                "created_at": "2026-01-20T00:00:00Z"
            }],
            "page": 1,
            "per_page": 10,
            "total": 1
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    store: web::Data<Store>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let employee_id = if auth.role.is_reviewer() {
        query.employee_id
    } else {
        Some(auth.require_employee_profile()?)
    };
    let page = PageRequest::new(query.page, query.per_page);

    let mut leaves = store
        .leaves
        .fetch_by_filter(&|l: &LeaveRequest| {
            employee_id.is_none_or(|id| l.employee_id == id)
                && query.status.is_none_or(|s| l.status == s)
        })
        .map_err(internal("Failed to fetch leave list"))?;
    leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(HttpResponse::Ok().json(page.apply(leaves)))
}

/// Counts of the caller's own leave applications
#[utoipa::path(
    get,
    path = "/api/leave/summary",
    responses(
        (status = 200, description = "Leave counts", body = LeaveSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_summary(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let leaves = store
        .leaves
        .fetch_by_filter(&|l: &LeaveRequest| l.employee_id == employee_id)
        .map_err(internal("Failed to fetch leave list"))?;

    Ok(HttpResponse::Ok().json(LeaveSummary::of(&leaves)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::repository::InMemoryRepository;
    use crate::seed;
    use actix_web::{App, http::StatusCode, test as atest};
    use std::sync::Arc;

    fn leave(id: u64, employee_id: u64, status: RequestStatus) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id,
            leave_type: LeaveType::Casual,
            from_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            to_date: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            reason: "Personal".to_string(),
            status,
            approved_by: None,
            created_at: Utc::now(),
        }
    }

    fn session(user_id: u64, role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id,
            username: format!("user{user_id}"),
            role,
            employee_id,
        }
    }

    fn store() -> Store {
        Store {
            employees: Arc::new(InMemoryRepository::with_rows(seed::employees())),
            leaves: Arc::new(InMemoryRepository::with_rows([
                leave(1, 1, RequestStatus::Pending),
                leave(2, 1, RequestStatus::Approved),
                leave(3, 2, RequestStatus::Pending),
            ])),
            ..Store::empty()
        }
    }

    #[actix_web::test]
    async fn manager_approves_pending_once() {
        let store = store();
        let manager = session(30, Role::Manager, Some(3));

        let resp = decide(manager.clone(), web::Data::new(store.clone()), 1, RequestStatus::Approved)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let stored = store.leaves.fetch_by_id(1).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.approved_by, Some(30));

        let again = decide(manager, web::Data::new(store.clone()), 1, RequestStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn employees_cannot_decide() {
        let result = decide(
            session(2, Role::Employee, Some(2)),
            web::Data::new(store()),
            1,
            RequestStatus::Approved,
        )
        .await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn reviewers_cannot_decide_their_own() {
        let result = decide(
            session(2, Role::Manager, Some(2)),
            web::Data::new(store()),
            3,
            RequestStatus::Approved,
        )
        .await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn managers_decide_only_for_direct_reports() {
        let store = store();
        let outsider = session(40, Role::Manager, Some(99));
        let result = decide(outsider, web::Data::new(store.clone()), 1, RequestStatus::Approved).await;
        assert_eq!(
            result.unwrap_err().as_response_error().status_code(),
            StatusCode::FORBIDDEN
        );
        assert!(store.leaves.fetch_by_id(1).unwrap().unwrap().status.is_pending());

        // HR is not limited to a reporting line
        let hr = session(4, Role::Hr, Some(4));
        let resp = decide(hr, web::Data::new(store.clone()), 3, RequestStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn create_validates_dates() {
        let token = generate_access_token(
            &session(1, Role::Employee, Some(1)),
            &Config::for_tests().jwt_secret,
            900,
        )
        .unwrap();
        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(store()))
                .route("/leave", web::post().to(create_leave)),
        )
        .await;

        let backwards = atest::TestRequest::post()
            .uri("/leave")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({
                "leave_type": "medical",
                "from_date": "2026-03-05",
                "to_date": "2026-03-01",
                "reason": "Surgery"
            }))
            .to_request();
        assert_eq!(atest::call_service(&app, backwards).await.status(), StatusCode::BAD_REQUEST);

        let ok = atest::TestRequest::post()
            .uri("/leave")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({
                "leave_type": "medical",
                "from_date": "2026-03-01",
                "to_date": "2026-03-05",
                "reason": "Surgery"
            }))
            .to_request();
        let created: serde_json::Value = atest::call_and_read_body_json(&app, ok).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["id"], 4);
    }

    #[test]
    fn summary_counts() {
        let s = LeaveSummary::of(&[
            leave(1, 1, RequestStatus::Pending),
            leave(2, 1, RequestStatus::Approved),
            leave(3, 1, RequestStatus::Approved),
        ]);
        assert_eq!((s.total, s.approved, s.pending, s.rejected), (3, 2, 1, 0));
    }
}
