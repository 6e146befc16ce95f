use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::repository::Entity;

use super::request_status::RequestStatus;

/// Scores under this keep a pending request in the slow lane.
pub const SLOW_PROCESSING_SCORE: u8 = 70;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            80.. => ScoreBand::High,
            60..=79 => ScoreBand::Medium,
            _ => ScoreBand::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transfer {
    pub id: u64,
    pub employee_id: u64,
    pub from_location: String,
    pub to_location: String,
    #[schema(value_type = String, format = "date")]
    pub request_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date")]
    pub approval_date: Option<NaiveDate>,
    pub status: RequestStatus,
    pub reason: String,
    /// Priority score, 0..=100.
    pub score: u8,
}

impl Entity for Transfer {
    const NAME: &'static str = "transfer";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Transfer {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::of(self.score)
    }

    pub fn slow_processing_warning(&self) -> bool {
        self.status.is_pending() && self.score < SLOW_PROCESSING_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands() {
        assert_eq!(ScoreBand::of(100), ScoreBand::High);
        assert_eq!(ScoreBand::of(80), ScoreBand::High);
        assert_eq!(ScoreBand::of(79), ScoreBand::Medium);
        assert_eq!(ScoreBand::of(60), ScoreBand::Medium);
        assert_eq!(ScoreBand::of(59), ScoreBand::Low);
    }
}
