pub mod appraisal;
pub mod attendance;
pub mod employee;
pub mod leave_request;
pub mod request_status;
pub mod role;
pub mod transfer;
pub mod user;
