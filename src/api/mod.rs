pub mod analytics;
pub mod appraisal;
pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod transfer;

use actix_web::error::{ErrorForbidden, ErrorInternalServerError};

use crate::{auth::auth::AuthUser, db::Store, model::role::Role};

/// Logs a repository failure and hides it behind a 500.
pub(crate) fn internal<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> actix_web::Error {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        ErrorInternalServerError("Internal Server Error")
    }
}

/// Managers act only on their direct reports; HR and admins on anyone.
pub(crate) fn require_line_manager(
    auth: &AuthUser,
    store: &Store,
    employee_id: u64,
) -> actix_web::Result<()> {
    if auth.role != Role::Manager {
        return Ok(());
    }
    let reports_to_caller = store
        .employees
        .fetch_by_id(employee_id)
        .map_err(internal("Failed to fetch employee"))?
        .is_some_and(|e| e.reporting_manager.is_some() && e.reporting_manager == auth.employee_id);
    if reports_to_caller {
        Ok(())
    } else {
        Err(ErrorForbidden("Not your direct report"))
    }
}
