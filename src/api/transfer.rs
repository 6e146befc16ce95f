use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    analytics::{AttendanceSummary, transfer_score},
    api::internal,
    auth::auth::AuthUser,
    db::Store,
    model::{
        appraisal::{Appraisal, AppraisalStatus},
        attendance::Attendance,
        request_status::RequestStatus,
        transfer::{ScoreBand, Transfer},
    },
    utils::pagination::PageRequest,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateTransfer {
    #[schema(example = "South Zone")]
    pub to_location: String,
    #[schema(example = "Closer to residence")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransferQuery {
    /// Filter by status
    #[param(value_type = Option<String>)]
    pub status: Option<RequestStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A transfer request as the dashboards show it.
#[derive(Serialize, ToSchema)]
pub struct TransferView {
    #[serde(flatten)]
    pub transfer: Transfer,
    pub score_band: ScoreBand,
    pub slow_processing_warning: bool,
}

impl From<Transfer> for TransferView {
    fn from(transfer: Transfer) -> Self {
        Self {
            score_band: transfer.score_band(),
            slow_processing_warning: transfer.slow_processing_warning(),
            transfer,
        }
    }
}

/// Priority score from the latest completed appraisal and the attendance history.
fn score_for(store: &Store, employee_id: u64) -> Result<u8, crate::repository::RepoError> {
    let latest_final = store
        .appraisals
        .fetch_by_filter(&|a: &Appraisal| {
            a.employee_id == employee_id && a.status == AppraisalStatus::Completed
        })?
        .into_iter()
        .max_by_key(|a| a.year)
        .and_then(|a| a.final_score);
    let records = store
        .attendance
        .fetch_by_filter(&|a: &Attendance| a.employee_id == employee_id)?;

    Ok(transfer_score(
        latest_final,
        &AttendanceSummary::from_records(&records),
    ))
}

#[utoipa::path(
    post,
    path = "/api/transfer",
    request_body = CreateTransfer,
    responses(
        (status = 201, description = "Transfer requested", body = TransferView),
        (status = 400, description = "Invalid destination or reason"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "A transfer request is already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    auth: AuthUser,
    store: web::Data<Store>,
    payload: web::Json<CreateTransfer>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let to_location = payload.to_location.trim();
    let reason = payload.reason.trim();

    if to_location.is_empty() || reason.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "to_location and reason are required"
        })));
    }

    let Some(employee) = store
        .employees
        .fetch_by_id(employee_id)
        .map_err(internal("Failed to fetch employee"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };

    if to_location.eq_ignore_ascii_case(&employee.current_posting) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Already posted at that location"
        })));
    }

    let open = store
        .transfers
        .count(&|t: &Transfer| t.employee_id == employee_id && t.status.is_pending())
        .map_err(internal("Failed to fetch transfers"))?;
    if open > 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "A transfer request is already pending"
        })));
    }

    let score = score_for(&store, employee_id).map_err(internal("Failed to score transfer"))?;
    let transfer = store
        .transfers
        .insert(Transfer {
            id: 0,
            employee_id,
            from_location: employee.current_posting,
            to_location: to_location.to_string(),
            request_date: Local::now().date_naive(),
            approval_date: None,
            status: RequestStatus::Pending,
            reason: reason.to_string(),
            score,
        })
        .map_err(internal("Failed to create transfer"))?;

    info!(employee_id, transfer_id = transfer.id, score, "Transfer requested");
    Ok(HttpResponse::Created().json(TransferView::from(transfer)))
}

/// HR and admins see every request, everyone else only their own.
#[utoipa::path(
    get,
    path = "/api/transfer",
    params(TransferQuery),
    responses(
        (status = 200, description = "Paginated transfers, newest first", body = Object, example = json!({
            "data": [{
                "id": 1,
                "employee_id": 1,
                "from_location": "Central Zone",
                "to_location": "South Zone",
                "request_date": "2025-12-01",
                "approval_date": null,
                "status": "pending",
                "reason": "Closer to residence",
                "score": 78,
                "score_band": "medium",
                "slow_processing_warning": false
            }],
            "page": 1,
            "per_page": 10,
            "total": 1
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn list_transfers(
    auth: AuthUser,
    store: web::Data<Store>,
    query: web::Query<TransferQuery>,
) -> actix_web::Result<impl Responder> {
    let own = if auth.require_hr_or_admin().is_ok() {
        None
    } else {
        Some(auth.require_employee_profile()?)
    };
    let page = PageRequest::new(query.page, query.per_page);

    let mut transfers = store
        .transfers
        .fetch_by_filter(&|t: &Transfer| {
            own.is_none_or(|id| t.employee_id == id) && query.status.is_none_or(|s| t.status == s)
        })
        .map_err(internal("Failed to fetch transfers"))?;
    transfers.sort_by(|a, b| b.request_date.cmp(&a.request_date));

    let views: Vec<TransferView> = transfers.into_iter().map(TransferView::from).collect();
    Ok(HttpResponse::Ok().json(page.apply(views)))
}

/// Pending requests, highest score first
#[utoipa::path(
    get,
    path = "/api/transfer/pending",
    responses(
        (status = 200, description = "Pending queue", body = [TransferView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn pending_transfers(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut pending = store
        .transfers
        .fetch_by_filter(&|t: &Transfer| t.status.is_pending())
        .map_err(internal("Failed to fetch transfers"))?;
    pending.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.request_date.cmp(&b.request_date))
    });

    let views: Vec<TransferView> = pending.into_iter().map(TransferView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

async fn decide(
    auth: AuthUser,
    store: web::Data<Store>,
    transfer_id: u64,
    status: RequestStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let pending = store
        .transfers
        .fetch_by_id(transfer_id)
        .map_err(internal("Failed to fetch transfer"))?
        .filter(|t| t.status.is_pending());
    let Some(mut transfer) = pending else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Transfer not found or already processed"
        })));
    };

    transfer.status = status;
    transfer.approval_date = Some(Local::now().date_naive());
    let transfer = store
        .transfers
        .update(transfer)
        .map_err(internal("Failed to update transfer"))?;

    if status == RequestStatus::Approved {
        if let Some(mut employee) = store
            .employees
            .fetch_by_id(transfer.employee_id)
            .map_err(internal("Failed to fetch employee"))?
        {
            employee.current_posting = transfer.to_location.clone();
            store
                .employees
                .update(employee)
                .map_err(internal("Failed to update posting"))?;
        }
    }

    info!(transfer_id, status = %status, by = auth.user_id, "Transfer decided");
    Ok(HttpResponse::Ok().json(TransferView::from(transfer)))
}

#[utoipa::path(
    put,
    path = "/api/transfer/{id}/approve",
    params(("id" = u64, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer approved", body = TransferView),
        (status = 400, description = "Transfer not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn approve_transfer(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, store, path.into_inner(), RequestStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/transfer/{id}/reject",
    params(("id" = u64, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer rejected", body = TransferView),
        (status = 400, description = "Transfer not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn reject_transfer(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    decide(auth, store, path.into_inner(), RequestStatus::Rejected).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::repository::InMemoryRepository;
    use crate::seed;
    use actix_web::{App, http::StatusCode, test as atest};
    use std::sync::Arc;

    fn seeded() -> Store {
        Store {
            employees: Arc::new(InMemoryRepository::with_rows(seed::employees())),
            attendance: Arc::new(InMemoryRepository::with_rows(seed::attendance())),
            transfers: Arc::new(InMemoryRepository::with_rows(seed::transfers())),
            appraisals: Arc::new(InMemoryRepository::with_rows(seed::appraisals())),
            ..Store::empty()
        }
    }

    fn session(employee_id: u64, role: Role) -> AuthUser {
        AuthUser {
            user_id: employee_id,
            username: format!("user{employee_id}"),
            role,
            employee_id: Some(employee_id),
        }
    }

    #[test]
    fn score_uses_latest_completed_appraisal() {
        // employee 3: final 88, 2/2 present and compliant
        // 0.5 * 88 + 0.25 * 100 + 0.25 * 100 = 94
        assert_eq!(score_for(&seeded(), 3).unwrap(), 94);
        // employee 6: nothing scored, no attendance
        assert_eq!(score_for(&seeded(), 6).unwrap(), 0);
    }

    #[test]
    fn view_flags_slow_requests() {
        let views: Vec<TransferView> = seed::transfers().into_iter().map(Into::into).collect();
        assert!(!views[0].slow_processing_warning);
        assert_eq!(views[0].score_band, ScoreBand::Medium);
        assert!(!views[1].slow_processing_warning);
        assert_eq!(views[1].score_band, ScoreBand::High);
        assert!(views[2].slow_processing_warning);
    }

    #[actix_web::test]
    async fn approval_moves_the_posting() {
        let store = seeded();
        let resp = decide(
            session(4, Role::Hr),
            web::Data::new(store.clone()),
            1,
            RequestStatus::Approved,
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let transfer = store.transfers.fetch_by_id(1).unwrap().unwrap();
        assert_eq!(transfer.status, RequestStatus::Approved);
        assert!(transfer.approval_date.is_some());
        let employee = store.employees.fetch_by_id(1).unwrap().unwrap();
        assert_eq!(employee.current_posting, "South Zone");

        let again = decide(
            session(4, Role::Hr),
            web::Data::new(store),
            1,
            RequestStatus::Rejected,
        )
        .await
        .unwrap();
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn managers_cannot_decide_transfers() {
        let result = decide(
            session(3, Role::Manager),
            web::Data::new(seeded()),
            3,
            RequestStatus::Approved,
        )
        .await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn pending_queue_sorted_by_score() {
        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(crate::config::Config::for_tests()))
                .app_data(web::Data::new(seeded()))
                .route("/transfer/pending", web::get().to(pending_transfers)),
        )
        .await;
        let token = crate::auth::jwt::generate_access_token(
            &session(4, Role::Hr),
            &crate::config::Config::for_tests().jwt_secret,
            900,
        )
        .unwrap();
        let req = atest::TestRequest::get()
            .uri("/transfer/pending")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(body[1]["slow_processing_warning"], true);
    }
}
