use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    analytics::{
        PerformanceDistribution, average_final_score, headcount_by_department, mean_rates,
    },
    api::internal,
    auth::auth::AuthUser,
    db::Store,
    model::{
        appraisal::{Appraisal, AppraisalStatus},
        employee::Employee,
        leave_request::LeaveRequest,
        transfer::Transfer,
    },
};

#[derive(Serialize, ToSchema)]
pub struct FlaggedAppraisal {
    pub appraisal_id: u64,
    pub employee_id: u64,
    pub attendance_impact: i8,
    pub geo_hazri_compliance: f64,
}

#[derive(Serialize, ToSchema)]
pub struct Overview {
    /// Employees and managers; HR and admin accounts are not counted.
    pub total_workforce: usize,
    pub pending_appraisals: usize,
    pub pending_transfers: usize,
    pub pending_leaves: usize,
    pub avg_attendance_rate: f64,
    pub avg_geo_hazri_rate: f64,
    pub avg_final_score: f64,
    pub performance: PerformanceDistribution,
    pub headcount_by_department: BTreeMap<String, usize>,
    pub attendance_issues: Vec<FlaggedAppraisal>,
}

fn overview(store: &Store) -> Result<Overview, crate::repository::RepoError> {
    let workforce = store
        .employees
        .fetch_by_filter(&|e: &Employee| e.role.is_workforce())?;
    let workforce_ids: Vec<u64> = workforce.iter().map(|e| e.id).collect();
    let records = store.attendance.fetch_all()?;
    let appraisals = store.appraisals.fetch_all()?;
    let (avg_attendance_rate, avg_geo_hazri_rate) = mean_rates(&workforce_ids, &records);

    Ok(Overview {
        total_workforce: workforce.len(),
        pending_appraisals: appraisals
            .iter()
            .filter(|a| a.status != AppraisalStatus::Completed)
            .count(),
        pending_transfers: store
            .transfers
            .count(&|t: &Transfer| t.status.is_pending())?,
        pending_leaves: store
            .leaves
            .count(&|l: &LeaveRequest| l.status.is_pending())?,
        avg_attendance_rate,
        avg_geo_hazri_rate,
        avg_final_score: average_final_score(&appraisals),
        performance: PerformanceDistribution::from_appraisals(&appraisals),
        headcount_by_department: headcount_by_department(
            workforce.iter().map(|e| e.department.as_str()),
        ),
        attendance_issues: appraisals
            .iter()
            .filter(|a| a.has_attendance_issues())
            .map(|a: &Appraisal| FlaggedAppraisal {
                appraisal_id: a.id,
                employee_id: a.employee_id,
                attendance_impact: a.attendance_impact,
                geo_hazri_compliance: a.geo_hazri_compliance,
            })
            .collect(),
    })
}

/// Workforce dashboard figures
#[utoipa::path(
    get,
    path = "/api/analytics/overview",
    responses(
        (status = 200, description = "Dashboard figures", body = Overview),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn analytics_overview(
    auth: AuthUser,
    store: web::Data<Store>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let overview = overview(&store).map_err(internal("Failed to build analytics overview"))?;
    Ok(HttpResponse::Ok().json(overview))
}
