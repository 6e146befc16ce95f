use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::Entity;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppraisalStatus {
    Draft,
    Submitted,
    Reviewed,
    Completed,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Goal {
    pub id: u64,
    pub description: String,
    #[schema(value_type = String, format = "date")]
    pub target_date: NaiveDate,
    pub status: GoalStatus,
    /// 1..=5
    pub self_rating: Option<u8>,
    /// 1..=5
    pub manager_rating: Option<u8>,
}

#[derive(Debug, Error, PartialEq)]
pub enum AppraisalError {
    #[error("score {0} is outside 0..=100")]
    Score(u8),
    #[error("rating {0} is outside 1..=5")]
    Rating(u8),
    #[error("cannot {action} an appraisal that is {from}")]
    Transition {
        from: AppraisalStatus,
        action: &'static str,
    },
    #[error("goal {0} not found")]
    GoalNotFound(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Appraisal {
    pub id: u64,
    pub employee_id: u64,
    pub year: i32,
    pub self_score: Option<u8>,
    pub manager_score: Option<u8>,
    pub hr_score: Option<u8>,
    pub final_score: Option<u8>,
    /// Points added to the base score; negative for attendance issues.
    pub attendance_impact: i8,
    /// Share of geo-compliant check-ins over the cycle, in percent.
    pub geo_hazri_compliance: f64,
    pub beat_coverage: Option<f64>,
    pub status: AppraisalStatus,
    pub goals: Vec<Goal>,
}

impl Entity for Appraisal {
    const NAME: &'static str = "appraisal";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoreBreakdown {
    pub self_score: Option<u8>,
    pub manager_score: Option<u8>,
    pub hr_score: Option<u8>,
    /// Mean of the scores given so far.
    pub base_score: f64,
    pub attendance_impact: i8,
    pub adjusted_score: f64,
    pub geo_hazri_compliance: f64,
    pub final_score: Option<u8>,
}

fn check_score(score: u8) -> Result<u8, AppraisalError> {
    if score <= 100 {
        Ok(score)
    } else {
        Err(AppraisalError::Score(score))
    }
}

fn check_rating(rating: Option<u8>) -> Result<Option<u8>, AppraisalError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(AppraisalError::Rating(r)),
        other => Ok(other),
    }
}

impl Appraisal {
    /// Flagged when attendance cost points or geo compliance fell under 95%.
    pub fn has_attendance_issues(&self) -> bool {
        self.attendance_impact < 0 || self.geo_hazri_compliance < 95.0
    }

    pub fn breakdown(&self) -> Option<ScoreBreakdown> {
        let given: Vec<f64> = [self.self_score, self.manager_score, self.hr_score]
            .into_iter()
            .flatten()
            .map(f64::from)
            .collect();
        if given.is_empty() {
            return None;
        }
        let base_score = given.iter().sum::<f64>() / given.len() as f64;

        Some(ScoreBreakdown {
            self_score: self.self_score,
            manager_score: self.manager_score,
            hr_score: self.hr_score,
            base_score,
            attendance_impact: self.attendance_impact,
            adjusted_score: base_score + f64::from(self.attendance_impact),
            geo_hazri_compliance: self.geo_hazri_compliance,
            final_score: self.final_score,
        })
    }

    fn expect_status(
        &self,
        expected: AppraisalStatus,
        action: &'static str,
    ) -> Result<(), AppraisalError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AppraisalError::Transition {
                from: self.status,
                action,
            })
        }
    }

    /// draft -> submitted
    pub fn submit_self_score(&mut self, score: u8) -> Result<(), AppraisalError> {
        self.expect_status(AppraisalStatus::Draft, "submit")?;
        self.self_score = Some(check_score(score)?);
        self.status = AppraisalStatus::Submitted;
        Ok(())
    }

    /// submitted -> reviewed
    pub fn review(&mut self, manager_score: u8) -> Result<(), AppraisalError> {
        self.expect_status(AppraisalStatus::Submitted, "review")?;
        self.manager_score = Some(check_score(manager_score)?);
        self.status = AppraisalStatus::Reviewed;
        Ok(())
    }

    /// reviewed -> completed; fixes the final score.
    pub fn finalize(&mut self, hr_score: u8) -> Result<u8, AppraisalError> {
        self.expect_status(AppraisalStatus::Reviewed, "finalize")?;
        self.hr_score = Some(check_score(hr_score)?);

        let adjusted = self
            .breakdown()
            .map(|b| b.adjusted_score)
            .unwrap_or_default();
        let final_score = adjusted.clamp(0.0, 100.0).round() as u8;

        self.final_score = Some(final_score);
        self.status = AppraisalStatus::Completed;
        Ok(final_score)
    }

    /// Goals can change only before the manager review.
    fn goals_editable(&self, action: &'static str) -> Result<(), AppraisalError> {
        match self.status {
            AppraisalStatus::Draft | AppraisalStatus::Submitted => Ok(()),
            from => Err(AppraisalError::Transition { from, action }),
        }
    }

    pub fn add_goal(
        &mut self,
        description: String,
        target_date: NaiveDate,
    ) -> Result<&Goal, AppraisalError> {
        self.goals_editable("add goals to")?;
        let id = self.goals.iter().map(|g| g.id).max().unwrap_or(0) + 1;
        self.goals.push(Goal {
            id,
            description,
            target_date,
            status: GoalStatus::NotStarted,
            self_rating: None,
            manager_rating: None,
        });
        Ok(&self.goals[self.goals.len() - 1])
    }

    pub fn update_goal(
        &mut self,
        goal_id: u64,
        status: Option<GoalStatus>,
        self_rating: Option<u8>,
        manager_rating: Option<u8>,
    ) -> Result<&Goal, AppraisalError> {
        let self_rating = check_rating(self_rating)?;
        let manager_rating = check_rating(manager_rating)?;
        let goal = self
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or(AppraisalError::GoalNotFound(goal_id))?;

        if let Some(status) = status {
            goal.status = status;
        }
        if self_rating.is_some() {
            goal.self_rating = self_rating;
        }
        if manager_rating.is_some() {
            goal.manager_rating = manager_rating;
        }
        Ok(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn draft() -> Appraisal {
        Appraisal {
            id: 1,
            employee_id: 1,
            year: 2025,
            self_score: None,
            manager_score: None,
            hr_score: None,
            final_score: None,
            attendance_impact: -3,
            geo_hazri_compliance: 92.0,
            beat_coverage: None,
            status: AppraisalStatus::Draft,
            goals: Vec::new(),
        }
    }

    #[test]
    fn breakdown_averages_scores_and_applies_impact() {
        let mut a = draft();
        a.self_score = Some(85);
        a.manager_score = Some(78);
        a.hr_score = Some(80);
        let b = a.breakdown().unwrap();
        assert_relative_eq!(b.base_score, 81.0);
        assert_relative_eq!(b.adjusted_score, 78.0);
    }

    #[test]
    fn no_breakdown_without_scores() {
        assert!(draft().breakdown().is_none());
    }

    #[test]
    fn workflow_runs_in_order() {
        let mut a = draft();
        a.submit_self_score(90).unwrap();
        assert_eq!(a.status, AppraisalStatus::Submitted);
        a.review(80).unwrap();
        assert_eq!(a.status, AppraisalStatus::Reviewed);
        // (90 + 80 + 70) / 3 - 3 = 77
        assert_eq!(a.finalize(70).unwrap(), 77);
        assert_eq!(a.final_score, Some(77));
        assert_eq!(a.status, AppraisalStatus::Completed);
    }

    #[test]
    fn out_of_order_transitions_fail() {
        let mut a = draft();
        assert_eq!(
            a.review(80),
            Err(AppraisalError::Transition {
                from: AppraisalStatus::Draft,
                action: "review"
            })
        );
        a.submit_self_score(50).unwrap();
        assert!(a.submit_self_score(60).is_err());
        assert!(a.finalize(60).is_err());
    }

    #[test]
    fn rejects_scores_over_100() {
        let mut a = draft();
        assert_eq!(a.submit_self_score(101), Err(AppraisalError::Score(101)));
        assert_eq!(a.status, AppraisalStatus::Draft);
    }

    #[test]
    fn final_score_is_clamped() {
        let mut a = draft();
        a.attendance_impact = -10;
        a.submit_self_score(2).unwrap();
        a.review(3).unwrap();
        assert_eq!(a.finalize(4).unwrap(), 0);
    }

    #[test]
    fn goals_lock_after_review() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let mut a = draft();
        let id = a.add_goal("Cover all beats".into(), date).unwrap().id;
        assert_eq!(id, 1);

        let goal = a
            .update_goal(id, Some(GoalStatus::InProgress), Some(4), None)
            .unwrap();
        assert_eq!(goal.status, GoalStatus::InProgress);
        assert_eq!(goal.self_rating, Some(4));

        assert_eq!(a.update_goal(id, None, Some(6), None).unwrap_err(), AppraisalError::Rating(6));
        assert_eq!(a.update_goal(9, None, None, None).unwrap_err(), AppraisalError::GoalNotFound(9));

        a.submit_self_score(70).unwrap();
        a.review(70).unwrap();
        assert!(a.add_goal("Late goal".into(), date).is_err());
    }

    #[test]
    fn attendance_issue_flag() {
        let mut a = draft();
        assert!(a.has_attendance_issues());
        a.attendance_impact = 0;
        a.geo_hazri_compliance = 97.5;
        assert!(!a.has_attendance_issues());
    }
}
