//! Read-only aggregations behind the dashboards.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::appraisal::Appraisal;
use crate::model::attendance::{Attendance, AttendanceStatus};

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total_days: usize,
    pub present_days: usize,
    pub geo_compliant_days: usize,
    pub attendance_rate: f64,
    pub geo_hazri_rate: f64,
}

impl AttendanceSummary {
    pub fn from_records(records: &[Attendance]) -> Self {
        let total_days = records.len();
        let present_days = records
            .iter()
            .filter(|a| a.status == AttendanceStatus::Present)
            .count();
        let geo_compliant_days = records.iter().filter(|a| a.geo_hazri_compliant).count();

        Self {
            total_days,
            present_days,
            geo_compliant_days,
            attendance_rate: percent(present_days, total_days),
            geo_hazri_rate: percent(geo_compliant_days, total_days),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PerformanceDistribution {
    /// final score >= 85
    pub excellent: usize,
    /// 70..85
    pub good: usize,
    /// 50..70
    pub average: usize,
    /// < 50
    pub poor: usize,
}

impl PerformanceDistribution {
    /// Appraisals without a final score are left out.
    pub fn from_appraisals(appraisals: &[Appraisal]) -> Self {
        let mut dist = Self::default();
        for score in appraisals.iter().filter_map(|a| a.final_score) {
            match score {
                85.. => dist.excellent += 1,
                70..=84 => dist.good += 1,
                50..=69 => dist.average += 1,
                _ => dist.poor += 1,
            }
        }
        dist
    }
}

/// Mean final score over scored appraisals; 0 when none are scored.
pub fn average_final_score(appraisals: &[Appraisal]) -> f64 {
    let scores: Vec<f64> = appraisals
        .iter()
        .filter_map(|a| a.final_score)
        .map(f64::from)
        .collect();
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Mean of per-employee rates. Employees without records count as 0%.
pub fn mean_rates(
    employee_ids: &[u64],
    records: &[Attendance],
) -> (f64, f64) {
    if employee_ids.is_empty() {
        return (0.0, 0.0);
    }
    let (attendance, geo) = employee_ids.iter().fold((0.0, 0.0), |(att, geo), id| {
        let own: Vec<Attendance> = records
            .iter()
            .filter(|a| a.employee_id == *id)
            .cloned()
            .collect();
        let summary = AttendanceSummary::from_records(&own);
        (att + summary.attendance_rate, geo + summary.geo_hazri_rate)
    });
    let n = employee_ids.len() as f64;
    (attendance / n, geo / n)
}

pub fn headcount_by_department<'a>(
    departments: impl IntoIterator<Item = &'a str>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for dept in departments {
        *counts.entry(dept.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Transfer priority: half performance, a quarter each attendance and
/// geo compliance. Missing final score counts as 0.
pub fn transfer_score(final_score: Option<u8>, attendance: &AttendanceSummary) -> u8 {
    let performance = final_score.map(f64::from).unwrap_or_default();
    let score =
        0.5 * performance + 0.25 * attendance.attendance_rate + 0.25 * attendance.geo_hazri_rate;
    score.clamp(0.0, 100.0).round() as u8
}
