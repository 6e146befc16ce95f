use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::AssignedLocation;
use crate::repository::Entity;

use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "MCD-1001",
        "name": "Rajesh Kumar",
        "email": "rajesh.kumar@mcd.gov.in",
        "phone": "+91 98100 00001",
        "role": "employee",
        "department": "Sanitation",
        "designation": "Sanitation Inspector",
        "joining_date": "2018-04-02",
        "reporting_manager": 3,
        "current_posting": "Karol Bagh Zone",
        "assigned_location": {
            "name": "Connaught Place Ward Office",
            "coordinate": { "lat": 28.6139, "lng": 77.2090 }
        }
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub name: String,
    pub email: String,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    pub role: Role,
    pub department: String,
    pub designation: String,
    #[schema(value_type = String, format = "date")]
    pub joining_date: NaiveDate,
    /// Employee id of the reporting manager.
    #[schema(nullable = true)]
    pub reporting_manager: Option<u64>,
    pub current_posting: String,
    #[schema(nullable = true)]
    pub assigned_location: Option<AssignedLocation>,
}

impl Entity for Employee {
    const NAME: &'static str = "employee";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Employee {
    /// Case-insensitive match on name, email or employee code.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
            || self.employee_code.to_lowercase().contains(&needle)
    }
}
