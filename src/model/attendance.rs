use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::geo::Coordinate;
use crate::repository::Entity;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, example = "09:02:11")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "17:45:00")]
    pub check_out: Option<NaiveTime>,
    /// Where the check-in reading was taken.
    pub location: Option<Coordinate>,
    pub distance_m: Option<f64>,
    pub geo_hazri_compliant: bool,
    pub status: AttendanceStatus,
}

impl Entity for Attendance {
    const NAME: &'static str = "attendance";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}
