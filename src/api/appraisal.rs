use actix_web::{HttpResponse, Responder, error::ErrorBadRequest, error::ErrorForbidden, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{internal, require_line_manager},
    auth::auth::AuthUser,
    db::Store,
    model::{
        appraisal::{Appraisal, AppraisalStatus, Goal, GoalStatus, ScoreBreakdown},
        employee::Employee,
    },
};

#[derive(Deserialize, ToSchema)]
pub struct ScoreReq {
    /// 0..=100
    #[schema(example = 82)]
    pub score: u8,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateGoal {
    #[schema(example = "Inspect all ward collection points monthly")]
    pub description: String,
    #[schema(example = "2026-12-31", format = "date", value_type = String)]
    pub target_date: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGoal {
    pub status: Option<GoalStatus>,
    /// Set by the appraisee, 1..=5
    pub self_rating: Option<u8>,
    /// Set by a reviewer, 1..=5
    pub manager_rating: Option<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct AppraisalView {
    #[serde(flatten)]
    pub appraisal: Appraisal,
    #[schema(nullable = true)]
    pub breakdown: Option<ScoreBreakdown>,
    pub has_attendance_issues: bool,
}

impl From<Appraisal> for AppraisalView {
    fn from(appraisal: Appraisal) -> Self {
        Self {
            breakdown: appraisal.breakdown(),
            has_attendance_issues: appraisal.has_attendance_issues(),
            appraisal,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QueueEntry {
    pub appraisal_id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub department: String,
    pub year: i32,
    pub status: AppraisalStatus,
    pub has_attendance_issues: bool,
}

fn load(store: &Store, id: u64) -> actix_web::Result<Option<Appraisal>> {
    store
        .appraisals
        .fetch_by_id(id)
        .map_err(internal("Failed to fetch appraisal"))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": "Appraisal not found"
    }))
}

fn save(store: &Store, appraisal: Appraisal) -> actix_web::Result<Appraisal> {
    store
        .appraisals
        .update(appraisal)
        .map_err(internal("Failed to update appraisal"))
}

/// Managers review only their direct reports; HR and admins review anyone.
fn may_review(auth: &AuthUser, store: &Store, appraisal: &Appraisal) -> actix_web::Result<()> {
    auth.require_reviewer()?;
    if auth.employee_id == Some(appraisal.employee_id) {
        return Err(ErrorForbidden("Cannot review your own appraisal"));
    }
    require_line_manager(auth, store, appraisal.employee_id)
}

/// Latest appraisal of the logged-in employee
#[utoipa::path(
    get,
    path = "/api/appraisal/me",
    responses(
        (status = 200, description = "Latest appraisal with breakdown", body = AppraisalView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 404, description = "No appraisal yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn my_appraisal(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let latest = store
        .appraisals
        .fetch_by_filter(&|a: &Appraisal| a.employee_id == employee_id)
        .map_err(internal("Failed to fetch appraisals"))?
        .into_iter()
        .max_by_key(|a| a.year);

    Ok(match latest {
        Some(appraisal) => HttpResponse::Ok().json(AppraisalView::from(appraisal)),
        None => not_found(),
    })
}

/// Appraisals still open, oldest cycle first
#[utoipa::path(
    get,
    path = "/api/appraisal/queue",
    responses(
        (status = 200, description = "Open appraisals", body = [QueueEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn appraisal_queue(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let open = store
        .appraisals
        .fetch_by_filter(&|a: &Appraisal| a.status != AppraisalStatus::Completed)
        .map_err(internal("Failed to fetch appraisals"))?;

    let mut queue = Vec::with_capacity(open.len());
    for appraisal in open {
        let employee: Option<Employee> = store
            .employees
            .fetch_by_id(appraisal.employee_id)
            .map_err(internal("Failed to fetch employee"))?;
        let (employee_name, department) = employee
            .map(|e| (e.name, e.department))
            .unwrap_or_default();
        queue.push(QueueEntry {
            appraisal_id: appraisal.id,
            employee_id: appraisal.employee_id,
            employee_name,
            department,
            year: appraisal.year,
            status: appraisal.status,
            has_attendance_issues: appraisal.has_attendance_issues(),
        });
    }
    queue.sort_by_key(|e| (e.year, e.appraisal_id));

    Ok(HttpResponse::Ok().json(queue))
}

#[utoipa::path(
    get,
    path = "/api/appraisal/{id}/breakdown",
    params(("id" = u64, Path, description = "Appraisal ID")),
    responses(
        (status = 200, description = "Score breakdown", body = ScoreBreakdown),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Appraisal not found or not scored yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn score_breakdown(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let Some(appraisal) = load(&store, path.into_inner())? else {
        return Ok(not_found());
    };
    if !auth.can_view_employee(appraisal.employee_id) {
        return Err(ErrorForbidden("Not your appraisal"));
    }

    Ok(match appraisal.breakdown() {
        Some(b) => HttpResponse::Ok().json(b),
        None => HttpResponse::NotFound().json(json!({
            "message": "No scores given yet"
        })),
    })
}

/// Self assessment; moves a draft to submitted
#[utoipa::path(
    put,
    path = "/api/appraisal/{id}/submit",
    params(("id" = u64, Path, description = "Appraisal ID")),
    request_body = ScoreReq,
    responses(
        (status = 200, description = "Submitted", body = AppraisalView),
        (status = 400, description = "Invalid score or appraisal not in draft"),
        (status = 403, description = "Not your appraisal"),
        (status = 404, description = "Appraisal not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn submit_self_score(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<ScoreReq>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let Some(mut appraisal) = load(&store, path.into_inner())? else {
        return Ok(not_found());
    };
    if appraisal.employee_id != employee_id {
        return Err(ErrorForbidden("Not your appraisal"));
    }

    appraisal
        .submit_self_score(payload.score)
        .map_err(ErrorBadRequest)?;
    let appraisal = save(&store, appraisal)?;

    info!(appraisal_id = appraisal.id, employee_id, "Self assessment submitted");
    Ok(HttpResponse::Ok().json(AppraisalView::from(appraisal)))
}

/// Manager review; moves a submitted appraisal to reviewed
#[utoipa::path(
    put,
    path = "/api/appraisal/{id}/review",
    params(("id" = u64, Path, description = "Appraisal ID")),
    request_body = ScoreReq,
    responses(
        (status = 200, description = "Reviewed", body = AppraisalView),
        (status = 400, description = "Invalid score or appraisal not submitted"),
        (status = 403, description = "Not a reviewer of this employee"),
        (status = 404, description = "Appraisal not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn review_appraisal(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<ScoreReq>,
) -> actix_web::Result<impl Responder> {
    let Some(mut appraisal) = load(&store, path.into_inner())? else {
        return Ok(not_found());
    };
    may_review(&auth, &store, &appraisal)?;

    appraisal.review(payload.score).map_err(ErrorBadRequest)?;
    let appraisal = save(&store, appraisal)?;

    info!(appraisal_id = appraisal.id, by = auth.user_id, "Appraisal reviewed");
    Ok(HttpResponse::Ok().json(AppraisalView::from(appraisal)))
}

/// HR sign-off; fixes the final score
#[utoipa::path(
    put,
    path = "/api/appraisal/{id}/finalize",
    params(("id" = u64, Path, description = "Appraisal ID")),
    request_body = ScoreReq,
    responses(
        (status = 200, description = "Completed", body = AppraisalView),
        (status = 400, description = "Invalid score or appraisal not reviewed"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Appraisal not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn finalize_appraisal(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<ScoreReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let Some(mut appraisal) = load(&store, path.into_inner())? else {
        return Ok(not_found());
    };
    if auth.employee_id == Some(appraisal.employee_id) {
        return Err(ErrorForbidden("Cannot finalize your own appraisal"));
    }

    let final_score = appraisal.finalize(payload.score).map_err(ErrorBadRequest)?;
    let appraisal = save(&store, appraisal)?;

    info!(appraisal_id = appraisal.id, final_score, "Appraisal finalized");
    Ok(HttpResponse::Ok().json(AppraisalView::from(appraisal)))
}

#[utoipa::path(
    post,
    path = "/api/appraisal/{id}/goals",
    params(("id" = u64, Path, description = "Appraisal ID")),
    request_body = CreateGoal,
    responses(
        (status = 201, description = "Goal added", body = Goal),
        (status = 400, description = "Appraisal already reviewed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Appraisal not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn add_goal(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<u64>,
    payload: web::Json<CreateGoal>,
) -> actix_web::Result<impl Responder> {
    let Some(mut appraisal) = load(&store, path.into_inner())? else {
        return Ok(not_found());
    };
    if !auth.can_view_employee(appraisal.employee_id) {
        return Err(ErrorForbidden("Not your appraisal"));
    }
    let CreateGoal {
        description,
        target_date,
    } = payload.into_inner();
    if description.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "description is required"
        })));
    }

    let goal: Goal = appraisal
        .add_goal(description.trim().to_string(), target_date)
        .map_err(ErrorBadRequest)?
        .clone();
    save(&store, appraisal)?;

    Ok(HttpResponse::Created().json(goal))
}

/// Appraisees rate themselves, reviewers set the manager rating.
#[utoipa::path(
    put,
    path = "/api/appraisal/{id}/goals/{goal_id}",
    params(
        ("id" = u64, Path, description = "Appraisal ID"),
        ("goal_id" = u64, Path, description = "Goal ID")
    ),
    request_body = UpdateGoal,
    responses(
        (status = 200, description = "Goal updated", body = Goal),
        (status = 400, description = "Rating outside 1..=5 or goal not found"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Appraisal not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Appraisal"
)]
pub async fn update_goal(
    auth: AuthUser,
    store: web::Data<Store>,
    path: web::Path<(u64, u64)>,
    payload: web::Json<UpdateGoal>,
) -> actix_web::Result<impl Responder> {
    let (appraisal_id, goal_id) = path.into_inner();
    let Some(mut appraisal) = load(&store, appraisal_id)? else {
        return Ok(not_found());
    };

    let own = auth.employee_id == Some(appraisal.employee_id);
    if !own && !auth.role.is_reviewer() {
        return Err(ErrorForbidden("Not your appraisal"));
    }
    if payload.self_rating.is_some() && !own {
        return Err(ErrorForbidden("Only the appraisee sets the self rating"));
    }
    if payload.manager_rating.is_some() {
        may_review(&auth, &store, &appraisal)?;
    }

    let goal: Goal = appraisal
        .update_goal(
            goal_id,
            payload.status,
            payload.self_rating,
            payload.manager_rating,
        )
        .map_err(ErrorBadRequest)?
        .clone();
    save(&store, appraisal)?;

    Ok(HttpResponse::Ok().json(goal))
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

    fn seeded() -> Store {
        Store {
            employees: Arc::new(InMemoryRepository::with_rows(seed::employees())),
            appraisals: Arc::new(InMemoryRepository::with_rows(seed::appraisals())),
            ..Store::empty()
        }
    }

    fn bearer(employee_id: u64, role: Role) -> (&'static str, String) {
        let user = AuthUser {
            user_id: employee_id,
            username: format!("user{employee_id}"),
            role,
            employee_id: Some(employee_id),
        };
        let token = generate_access_token(&user, &Config::for_tests().jwt_secret, 900).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! app {
        ($store:expr) => {
            atest::init_service(
                App::new()
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data(web::Data::new($store.clone()))
                    .route("/appraisal/me", web::get().to(my_appraisal))
                    .route("/appraisal/queue", web::get().to(appraisal_queue))
                    .route("/appraisal/{id}/breakdown", web::get().to(score_breakdown))
                    .route("/appraisal/{id}/submit", web::put().to(submit_self_score))
                    .route("/appraisal/{id}/review", web::put().to(review_appraisal))
                    .route("/appraisal/{id}/finalize", web::put().to(finalize_appraisal))
                    .route("/appraisal/{id}/goals", web::post().to(add_goal))
                    .route("/appraisal/{id}/goals/{goal_id}", web::put().to(update_goal)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn own_appraisal_has_breakdown() {
        let store = seeded();
        let app = app!(store);
        let req = atest::TestRequest::get()
            .uri("/appraisal/me")
            .insert_header(bearer(1, Role::Employee))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["final_score"], 78);
        assert_eq!(body["has_attendance_issues"], true);
        assert_eq!(body["breakdown"]["attendance_impact"], -3);
    }

    #[actix_web::test]
    async fn full_workflow_over_http() {
        let store = seeded();
        let app = app!(store);

        let req = atest::TestRequest::put()
            .uri("/appraisal/4/submit")
            .insert_header(bearer(6, Role::Employee))
            .set_json(json!({ "score": 80 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::OK);

        // HR cannot finalize before the manager review
        let req = atest::TestRequest::put()
            .uri("/appraisal/4/finalize")
            .insert_header(bearer(4, Role::Hr))
            .set_json(json!({ "score": 70 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = atest::TestRequest::put()
            .uri("/appraisal/4/review")
            .insert_header(bearer(3, Role::Manager))
            .set_json(json!({ "score": 75 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::OK);

        let req = atest::TestRequest::put()
            .uri("/appraisal/4/finalize")
            .insert_header(bearer(4, Role::Hr))
            .set_json(json!({ "score": 70 }))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["final_score"], 75);
    }

    #[actix_web::test]
    async fn managers_review_only_their_reports() {
        let store = seeded();
        let app = app!(store);
        // Amit (3) is not his own reviewer
        let req = atest::TestRequest::put()
            .uri("/appraisal/3/review")
            .insert_header(bearer(3, Role::Manager))
            .set_json(json!({ "score": 90 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::put()
            .uri("/appraisal/2/review")
            .insert_header(bearer(1, Role::Employee))
            .set_json(json!({ "score": 90 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn queue_skips_completed() {
        let store = seeded();
        let app = app!(store);
        let req = atest::TestRequest::get()
            .uri("/appraisal/queue")
            .insert_header(bearer(4, Role::Hr))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        let ids: Vec<u64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["appraisal_id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(body[0]["employee_name"], "Priya Sharma");
    }

    #[actix_web::test]
    async fn goal_ratings_by_role() {
        let store = seeded();
        let app = app!(store);

        let req = atest::TestRequest::post()
            .uri("/appraisal/2/goals")
            .insert_header(bearer(2, Role::Employee))
            .set_json(json!({ "description": "Audit cold chain", "target_date": "2026-06-30" }))
            .to_request();
        let goal: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(goal["id"], 2);
        assert_eq!(goal["status"], "not-started");

        // the appraisee cannot set the manager rating
        let req = atest::TestRequest::put()
            .uri("/appraisal/2/goals/2")
            .insert_header(bearer(2, Role::Employee))
            .set_json(json!({ "manager_rating": 5 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::put()
            .uri("/appraisal/2/goals/2")
            .insert_header(bearer(3, Role::Manager))
            .set_json(json!({ "manager_rating": 7 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = atest::TestRequest::put()
            .uri("/appraisal/2/goals/2")
            .insert_header(bearer(3, Role::Manager))
            .set_json(json!({ "manager_rating": 4, "status": "in-progress" }))
            .to_request();
        let goal: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(goal["manager_rating"], 4);
        assert_eq!(goal["status"], "in-progress");

        let stored = store.appraisals.fetch_by_id(2).unwrap().unwrap();
        assert_eq!(stored.goals.len(), 2);
    }
}
