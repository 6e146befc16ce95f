use chrono::{DateTime, Utc};

use crate::repository::Entity;

use super::role::Role;

/// A login account. Never serialized: it carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Accounts without a hash cannot log in.
    pub password_hash: Option<String>,
    pub role: Role,
    pub employee_id: Option<u64>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Entity for User {
    const NAME: &'static str = "user";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}
