use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::model::user::User;
use crate::repository::Repository;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Check if a username might exist (false positives possible)
pub fn might_exist(username: &str) -> bool {
    let username = normalize(username);
    USERNAME_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&username)
}

/// Insert a single username into the filter
pub fn insert(username: &str) {
    let username = normalize(username);
    USERNAME_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&username);
}

/// Warm up the username filter from the user repository in batches
pub fn warmup_username_filter(users: &dyn Repository<User>, batch_size: usize) -> Result<()> {
    let usernames: Vec<String> = users
        .fetch_all()?
        .into_iter()
        .map(|u| normalize(&u.username))
        .collect();

    for batch in usernames.chunks(batch_size.max(1)) {
        insert_batch(batch);
    }

    info!(users = usernames.len(), "Username filter warmup complete");
    Ok(())
}

/// Insert a batch of normalized usernames
fn insert_batch(usernames: &[String]) {
    let mut filter = USERNAME_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    for username in usernames {
        filter.add(username);
    }
}

/// true => username AVAILABLE
pub fn is_username_available(username: &str, users: &dyn Repository<User>) -> Result<bool> {
    // Fast negative: not in the filter means never registered
    if !might_exist(username) {
        return Ok(true);
    }

    let wanted = normalize(username);
    let taken = users
        .fetch_one(&|u: &User| normalize(&u.username) == wanted)?
        .is_some();
    Ok(!taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::repository::InMemoryRepository;

    fn account(id: u64, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            password_hash: None,
            role: Role::Employee,
            employee_id: None,
            is_active: true,
            last_login_at: None,
        }
    }

    #[test]
    fn warmup_marks_existing_names_taken() {
        let repo = InMemoryRepository::with_rows([account(1, "Filter.Test@MCD.gov.in")]);
        warmup_username_filter(&repo, 10).unwrap();

        assert!(might_exist("filter.test@mcd.gov.in"));
        assert!(!is_username_available("filter.test@mcd.gov.in", &repo).unwrap());
        assert!(is_username_available("nobody.else.filter@mcd.gov.in", &repo).unwrap());
    }

    #[test]
    fn filter_hit_falls_back_to_repository() {
        let repo = InMemoryRepository::<User>::new();
        insert("ghost.filter@mcd.gov.in");
        // in the filter but not stored
        assert!(is_username_available("ghost.filter@mcd.gov.in", &repo).unwrap());
    }
}
