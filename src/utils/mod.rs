pub mod checkin_cache;
pub mod pagination;
pub mod username_filter;
