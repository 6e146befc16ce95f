use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::{
    appraisal::Appraisal, attendance::Attendance, employee::Employee, leave_request::LeaveRequest,
    transfer::Transfer, user::User,
};
use crate::repository::{InMemoryRepository, Repository};
use crate::seed;

/// Every repository the handlers work against.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn Repository<User>>,
    pub employees: Arc<dyn Repository<Employee>>,
    pub attendance: Arc<dyn Repository<Attendance>>,
    pub leaves: Arc<dyn Repository<LeaveRequest>>,
    pub transfers: Arc<dyn Repository<Transfer>>,
    pub appraisals: Arc<dyn Repository<Appraisal>>,
}

impl Store {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            users: Arc::new(InMemoryRepository::<User>::new()),
            employees: Arc::new(InMemoryRepository::<Employee>::new()),
            attendance: Arc::new(InMemoryRepository::<Attendance>::new()),
            leaves: Arc::new(InMemoryRepository::<LeaveRequest>::new()),
            transfers: Arc::new(InMemoryRepository::<Transfer>::new()),
            appraisals: Arc::new(InMemoryRepository::<Appraisal>::new()),
        }
    }
}

/// Builds the seeded in-memory store. Seeded accounts can log in only when
/// a seed password is configured.
pub fn init_store(seed_password: Option<&str>) -> Result<Store> {
    let password_hash = seed_password.map(hash_password).transpose()?;
    if password_hash.is_none() {
        info!("SEED_PASSWORD not set, seeded accounts are login-disabled");
    }

    let store = Store {
        users: Arc::new(InMemoryRepository::with_rows(seed::users(
            password_hash.as_deref(),
        ))),
        employees: Arc::new(InMemoryRepository::with_rows(seed::employees())),
        attendance: Arc::new(InMemoryRepository::with_rows(seed::attendance())),
        leaves: Arc::new(InMemoryRepository::with_rows(seed::leaves())),
        transfers: Arc::new(InMemoryRepository::with_rows(seed::transfers())),
        appraisals: Arc::new(InMemoryRepository::with_rows(seed::appraisals())),
    };

    info!(
        employees = store.employees.count(&|_: &Employee| true)?,
        attendance = store.attendance.count(&|_: &Attendance| true)?,
        "Store seeded"
    );
    Ok(store)
}
