use actix_web::{HttpResponse, Responder, error::ErrorBadRequest, error::ErrorForbidden, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    analytics::AttendanceSummary,
    api::internal,
    auth::auth::AuthUser,
    db::Store,
    geo::{
        CheckInRegistry, ComplianceVerdict, Coordinate, LocationCapability, PositionFix,
        ReportedLocation,
    },
    model::attendance::{Attendance, AttendanceStatus},
    utils::{checkin_cache::CheckInCache, pagination::PageRequest},
};

#[derive(Deserialize, ToSchema)]
pub struct ReportedPosition {
    #[schema(example = 28.6141)]
    pub lat: f64,
    #[schema(example = 77.2093)]
    pub lng: f64,
    /// Reported accuracy radius in meters.
    #[schema(example = 15.0)]
    pub accuracy: Option<f64>,
}

/// What the device reported: a position, a position error code
/// (1 = permission denied, 2 = unavailable, 3 = timeout), or neither when the
/// device has no geolocation support.
#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "position": { "lat": 28.6141, "lng": 77.2093, "accuracy": 15.0 } }))]
pub struct CheckInRequest {
    pub position: Option<ReportedPosition>,
    pub error_code: Option<u16>,
}

impl CheckInRequest {
    fn into_capability(self) -> actix_web::Result<Option<ReportedLocation>> {
        match (self.position, self.error_code) {
            (Some(_), Some(_)) => Err(ErrorBadRequest(
                "Send either a position or an error_code, not both",
            )),
            (Some(p), None) => {
                let coordinate = Coordinate::new(p.lat, p.lng).map_err(ErrorBadRequest)?;
                Ok(Some(ReportedLocation::Fix(PositionFix {
                    coordinate,
                    accuracy_m: p.accuracy,
                })))
            }
            (None, Some(code)) => Ok(Some(ReportedLocation::Failed(code))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Defaults to the caller; others need a manager/HR/admin role
    pub employee_id: Option<u64>,
    #[param(value_type = Option<String>, example = "2026-01-01")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "2026-01-31")]
    pub to: Option<NaiveDate>,
    #[param(value_type = Option<String>, example = "present")]
    pub status: Option<AttendanceStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Whose records the caller asked for, if they may see them.
fn target_employee(auth: &AuthUser, requested: Option<u64>) -> actix_web::Result<u64> {
    let employee_id = match requested {
        Some(id) => id,
        None => auth.require_employee_profile()?,
    };
    if auth.can_view_employee(employee_id) {
        Ok(employee_id)
    } else {
        Err(ErrorForbidden("Not allowed to view this employee"))
    }
}

fn todays_record(store: &Store, employee_id: u64) -> actix_web::Result<Option<Attendance>> {
    let today = Local::now().date_naive();
    store
        .attendance
        .fetch_one(&|a: &Attendance| a.employee_id == employee_id && a.date == today)
        .map_err(internal("Failed to load today's attendance"))
}

fn already_checked_in() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "message": "Already checked in today"
    }))
}

/// Geo-fenced check-in
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Reading evaluated; verdict is compliant or violation", body = crate::geo::CheckInOutcome),
        (status = 400, description = "Already checked in today, or malformed reading", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "A check-in is already in progress"),
        (status = 422, description = "No reading could be obtained; verdict is error", body = crate::geo::CheckInOutcome)
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<Store>,
    registry: web::Data<CheckInRegistry>,
    cache: web::Data<CheckInCache>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;
    let employee = store
        .employees
        .fetch_by_id(employee_id)
        .map_err(internal("Failed to load employee"))?
        .ok_or_else(|| ErrorForbidden("No employee profile"))?;

    if todays_record(&store, employee_id)?.is_some() {
        return Ok(already_checked_in());
    }

    let capability = payload.into_inner().into_capability()?;
    let control = registry.control_for(employee_id);
    let Some(outcome) = control
        .check_in(
            employee.assigned_location.as_ref(),
            capability.as_ref().map(|c| c as &dyn LocationCapability),
        )
        .await
    else {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "A check-in is already in progress"
        })));
    };

    if let Some(reading) = outcome.reading {
        let now = Local::now();
        let today = now.date_naive();
        // a concurrent request may have recorded the day since the check above
        let inserted = store
            .attendance
            .insert_unless(
                &|a: &Attendance| a.employee_id == employee_id && a.date == today,
                Attendance {
                    id: 0,
                    employee_id,
                    date: today,
                    check_in: Some(now.time()),
                    check_out: None,
                    location: Some(reading.location),
                    distance_m: Some(reading.distance_m),
                    geo_hazri_compliant: outcome.is_compliant(),
                    status: AttendanceStatus::Present,
                },
            )
            .map_err(internal("Check-in failed"))?;
        let Some(record) = inserted else {
            return Ok(already_checked_in());
        };
        info!(
            employee_id,
            attendance_id = record.id,
            verdict = %outcome.verdict,
            "Attendance recorded"
        );
    }

    cache.record(employee_id, outcome.clone()).await;

    if outcome.verdict == ComplianceVerdict::Error {
        return Ok(HttpResponse::UnprocessableEntity().json(outcome));
    }
    Ok(HttpResponse::Ok().json(outcome))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;

    let open = todays_record(&store, employee_id)?
        .filter(|a| a.check_in.is_some() && a.check_out.is_none());
    let Some(mut record) = open else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found for today"
        })));
    };

    record.check_out = Some(Local::now().time());
    store
        .attendance
        .update(record)
        .map_err(internal("Check-out failed"))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully"
    })))
}

/// Attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = Object, example = json!({
            "data": [{
                "id": 1,
                "employee_id": 1,
                "date": "2026-01-05",
                "check_in": "09:05:00",
                "check_out": "17:40:00",
                "location": { "lat": 28.6142, "lng": 77.2095 },
                "distance_m": 58.0,
                "geo_hazri_compliant": true,
                "status": "present"
            }],
            "page": 1,
            "per_page": 10,
            "total": 1
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<Store>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = target_employee(&auth, query.employee_id)?;
    let page = PageRequest::new(query.page, query.per_page);

    let mut records = store
        .attendance
        .fetch_by_filter(&|a: &Attendance| {
            a.employee_id == employee_id
                && query.from.is_none_or(|from| a.date >= from)
                && query.to.is_none_or(|to| a.date <= to)
                && query.status.is_none_or(|s| a.status == s)
        })
        .map_err(internal("Failed to fetch attendance"))?;
    records.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(HttpResponse::Ok().json(page.apply(records)))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub employee_id: Option<u64>,
}

/// Attendance and geo-hazri rates
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    store: web::Data<Store>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = target_employee(&auth, query.employee_id)?;
    let records = store
        .attendance
        .fetch_by_filter(&|a: &Attendance| a.employee_id == employee_id)
        .map_err(internal("Failed to fetch attendance"))?;

    Ok(HttpResponse::Ok().json(AttendanceSummary::from_records(&records)))
}

/// Last check-in result of the caller (kept for 24 hours)
#[utoipa::path(
    get,
    path = "/api/attendance/check-in/latest",
    responses(
        (status = 200, description = "Latest outcome", body = crate::geo::CheckInOutcome),
        (status = 404, description = "No recent check-in", body = Object, example = json!({
            "message": "No recent check-in"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn latest_check_in(
    auth: AuthUser,
    cache: web::Data<CheckInCache>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_profile()?;

    match cache.latest(employee_id).await {
        Some(outcome) => Ok(HttpResponse::Ok().json(outcome)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No recent check-in"
        }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::geo::{AssignedLocation, PositionOptions};
    use crate::model::{employee::Employee, role::Role};
    use crate::repository::InMemoryRepository;
    use actix_web::{App, http::StatusCode, test as atest};
    use std::sync::Barrier;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn field_worker(id: u64, assigned: Option<AssignedLocation>) -> Employee {
        Employee {
            id,
            employee_code: format!("T-{id}"),
            name: "Test Worker".to_string(),
            email: format!("worker{id}@example.org"),
            phone: None,
            role: Role::Employee,
            department: "Sanitation".to_string(),
            designation: "Inspector".to_string(),
            joining_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            reporting_manager: None,
            current_posting: "Central Zone".to_string(),
            assigned_location: assigned,
        }
    }

    fn store() -> Store {
        let office = AssignedLocation::new(
            "Ward Office",
            Coordinate::new(28.6139, 77.2090).unwrap(),
        );
        Store {
            employees: Arc::new(InMemoryRepository::with_rows([
                field_worker(1, Some(office)),
                field_worker(2, None),
            ])),
            ..Store::empty()
        }
    }

    fn bearer(employee_id: u64) -> (&'static str, String) {
        let user = AuthUser {
            user_id: employee_id,
            username: format!("worker{employee_id}"),
            role: Role::Employee,
            employee_id: Some(employee_id),
        };
        let token = generate_access_token(&user, &Config::for_tests().jwt_secret, 900).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    macro_rules! app {
        ($store:expr, $cache:expr) => {
            atest::init_service(
                App::new()
                    .app_data(web::Data::new(Config::for_tests()))
                    .app_data(web::Data::new($store.clone()))
                    .app_data(web::Data::new(CheckInRegistry::new(
                        1_000.0,
                        PositionOptions::default(),
                    )))
                    .app_data(web::Data::new($cache.clone()))
                    .route("/attendance/check-in", web::post().to(check_in))
                    .route("/attendance/check-out", web::put().to(check_out))
                    .route("/attendance/summary", web::get().to(attendance_summary))
                    .route("/attendance/check-in/latest", web::get().to(latest_check_in)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn compliant_check_in_records_attendance() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let req = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(1))
            .set_json(json!({ "position": { "lat": 28.6141, "lng": 77.2093, "accuracy": 10.0 } }))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["verdict"], "compliant");

        let rows = store.attendance.fetch_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].geo_hazri_compliant);
        assert!(cache.latest(1).await.unwrap().is_compliant());

        // second attempt the same day
        let again = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(1))
            .set_json(json!({ "position": { "lat": 28.6141, "lng": 77.2093 } }))
            .to_request();
        let resp = atest::call_service(&app, again).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let out = atest::TestRequest::put()
            .uri("/attendance/check-out")
            .insert_header(bearer(1))
            .to_request();
        assert_eq!(atest::call_service(&app, out).await.status(), StatusCode::OK);
        assert!(store.attendance.fetch_all().unwrap()[0].check_out.is_some());
    }

    #[actix_web::test]
    async fn violation_is_recorded_as_non_compliant() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let req = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(1))
            .set_json(json!({ "position": { "lat": 28.6239, "lng": 77.2090 } }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["verdict"], "violation");

        let rows = store.attendance.fetch_all().unwrap();
        assert!(!rows[0].geo_hazri_compliant);
    }

    #[actix_web::test]
    async fn denied_permission_records_nothing() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let req = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(1))
            .set_json(json!({ "error_code": 1 }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["verdict"], "error");
        assert_eq!(body["error"], "permission_denied");
        assert!(store.attendance.fetch_all().unwrap().is_empty());

        let latest = atest::TestRequest::get()
            .uri("/attendance/check-in/latest")
            .insert_header(bearer(1))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, latest).await;
        assert_eq!(body["error"], "permission_denied");
    }

    #[actix_web::test]
    async fn unassigned_employee_gets_error_verdict() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let req = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(2))
            .set_json(json!({ "position": { "lat": 28.6141, "lng": 77.2093 } }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["error"], "no_assigned_location");
    }

    #[actix_web::test]
    async fn rejects_out_of_range_position() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let req = atest::TestRequest::post()
            .uri("/attendance/check-in")
            .insert_header(bearer(1))
            .set_json(json!({ "position": { "lat": 128.0, "lng": 77.2 } }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn employees_cannot_read_other_summaries() {
        let store = store();
        let cache = CheckInCache::new();
        let app = app!(store, cache);

        let mine = atest::TestRequest::get()
            .uri("/attendance/summary")
            .insert_header(bearer(1))
            .to_request();
        let body: serde_json::Value = atest::call_and_read_body_json(&app, mine).await;
        assert_eq!(body["total_days"], 0);

        let theirs = atest::TestRequest::get()
            .uri("/attendance/summary?employee_id=2")
            .insert_header(bearer(1))
            .to_request();
        let resp = atest::call_service(&app, theirs).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn simultaneous_check_ins_record_one_row() {
        for _ in 0..100 {
            let store = web::Data::new(store());
            let registry = web::Data::new(CheckInRegistry::new(1_000.0, PositionOptions::default()));
            let cache = web::Data::new(CheckInCache::new());
            let barrier = Arc::new(Barrier::new(2));
            let auth = AuthUser {
                user_id: 1,
                username: "worker1".to_string(),
                role: Role::Employee,
                employee_id: Some(1),
            };

            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let (auth, store, registry, cache, barrier) = (
                        auth.clone(),
                        store.clone(),
                        registry.clone(),
                        cache.clone(),
                        barrier.clone(),
                    );
                    std::thread::spawn(move || {
                        barrier.wait();
                        let request = web::Json(CheckInRequest {
                            position: Some(ReportedPosition {
                                lat: 28.6141,
                                lng: 77.2093,
                                accuracy: None,
                            }),
                            error_code: None,
                        });
                        actix_web::rt::System::new()
                            .block_on(check_in(auth, store, registry, cache, request))
                            .is_ok()
                    })
                })
                .collect();
            for worker in workers {
                assert!(worker.join().unwrap());
            }

            assert_eq!(store.attendance.fetch_all().unwrap().len(), 1);
        }
    }
}
