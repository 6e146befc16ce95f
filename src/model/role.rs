use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    Manager = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Employees and managers make up the field workforce.
    pub fn is_workforce(self) -> bool {
        matches!(self, Role::Employee | Role::Manager)
    }

    /// May look at other people's records.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Manager | Role::Hr | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn id_round_trips() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::Manager] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(5), None);
    }

    #[test]
    fn parses_lowercase_names() {
        assert_eq!(Role::from_str("hr").unwrap(), Role::Hr);
        assert_eq!(Role::Manager.to_string(), "manager");
    }
}
