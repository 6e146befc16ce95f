use crate::analytics::{AttendanceSummary, PerformanceDistribution};
use crate::api::analytics::{FlaggedAppraisal, Overview};
use crate::api::appraisal::{AppraisalView, CreateGoal, QueueEntry, ScoreReq, UpdateGoal};
use crate::api::attendance::{CheckInRequest, ReportedPosition};
use crate::api::employee::ProfileResponse;
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveSummary};
use crate::api::transfer::{CreateTransfer, TransferView};
use crate::auth::handlers::LoginResponse;
use crate::geo::{
    AssignedLocation, CheckInError, CheckInOutcome, CheckInReading, ComplianceVerdict, Coordinate,
};
use crate::model::appraisal::{Appraisal, AppraisalStatus, Goal, GoalStatus, ScoreBreakdown};
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveType};
use crate::model::request_status::RequestStatus;
use crate::model::role::Role;
use crate::model::transfer::{ScoreBand, Transfer};
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Hazri HRM API",
        version = "1.0.0",
        description = r#"
## Municipal HRM with geo-fenced attendance

Field staff check in from their phones; the reported position is compared
with the employee's assigned work location and the day is marked
**compliant** (within the radius, 1 km by default) or a **violation**.

### 🔹 Key Features
- **Geo Hazri attendance**
  - Check-in with location, check-out, history and monthly summary
- **Leave Management**
  - Apply for leave, approve/reject requests, and view leave history
- **Transfers**
  - Transfer requests ranked by a performance and attendance score
- **Appraisals**
  - Self assessment, manager review, HR sign-off and goals
- **Analytics**
  - Workforce, compliance and performance overview for HR

### 🔐 Security
Endpoints under `/api` need a **JWT Bearer** access token from `/auth/login`.
Refresh tokens rotate on every `/auth/refresh`.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::current_session,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::attendance_summary,
        crate::api::attendance::latest_check_in,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::leave_summary,

        crate::api::transfer::create_transfer,
        crate::api::transfer::list_transfers,
        crate::api::transfer::pending_transfers,
        crate::api::transfer::approve_transfer,
        crate::api::transfer::reject_transfer,

        crate::api::appraisal::my_appraisal,
        crate::api::appraisal::appraisal_queue,
        crate::api::appraisal::score_breakdown,
        crate::api::appraisal::submit_self_score,
        crate::api::appraisal::review_appraisal,
        crate::api::appraisal::finalize_appraisal,
        crate::api::appraisal::add_goal,
        crate::api::appraisal::update_goal,

        crate::api::employee::my_profile,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,

        crate::api::analytics::analytics_overview
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            Role,
            Coordinate,
            AssignedLocation,
            ComplianceVerdict,
            CheckInError,
            CheckInReading,
            CheckInOutcome,
            ReportedPosition,
            CheckInRequest,
            Attendance,
            AttendanceStatus,
            AttendanceSummary,
            RequestStatus,
            LeaveType,
            LeaveRequest,
            CreateLeave,
            LeaveFilter,
            LeaveSummary,
            ScoreBand,
            Transfer,
            TransferView,
            CreateTransfer,
            AppraisalStatus,
            GoalStatus,
            Goal,
            Appraisal,
            ScoreBreakdown,
            AppraisalView,
            QueueEntry,
            ScoreReq,
            CreateGoal,
            UpdateGoal,
            Employee,
            ProfileResponse,
            PerformanceDistribution,
            FlaggedAppraisal,
            Overview
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and registration"),
        (name = "Attendance", description = "Geo-fenced attendance APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Transfer", description = "Transfer request APIs"),
        (name = "Appraisal", description = "Performance appraisal APIs"),
        (name = "Employee", description = "Employee profile APIs"),
        (name = "Analytics", description = "HR dashboard APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/attendance/check-in",
            "/api/leave/{leave_id}",
            "/api/transfer/pending",
            "/api/appraisal/{id}/goals/{goal_id}",
            "/api/employee/me",
            "/api/analytics/overview",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
