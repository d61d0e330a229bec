//! Test fixture creation for the user database

use super::constants::*;
use anyhow::{bail, Result};
use journ_server::user::{FullUserStore, Registration, UserManager, UserVerificationStore};
use std::sync::Arc;

/// Registers the default test users and activates them.
pub fn create_test_users(
    user_manager: &UserManager,
    store: &Arc<dyn FullUserStore>,
) -> Result<()> {
    for (email, username, password) in [
        (TEST_EMAIL, TEST_USER, TEST_PASS),
        (OTHER_EMAIL, OTHER_USER, OTHER_PASS),
    ] {
        let user_id = create_activated_user(user_manager, store, email, username, password)?;
        eprintln!("Created test user {} with id {}", username, user_id);
    }
    Ok(())
}

/// Registers a user and activates it straight through the store,
/// without going through an email round trip.
pub fn create_activated_user(
    user_manager: &UserManager,
    store: &Arc<dyn FullUserStore>,
    email: &str,
    username: &str,
    password: &str,
) -> Result<usize> {
    let registered = user_manager.register(Registration {
        email: email.to_string(),
        username: username.to_string(),
        phone_number: None,
        password: password.to_string(),
    })?;
    if !store.activate_user(registered.user_id, &registered.code.to_string())? {
        bail!("Could not activate test user {}", username);
    }
    Ok(registered.user_id)
}

/// Pulls the encoded code out of a rendered verification email.
pub fn extract_code(html: &str) -> Option<String> {
    let start = html.find("?code=")? + "?code=".len();
    let rest = &html[start..];
    let end = rest
        .find(|c: char| c == '"' || c == '<' || c.is_whitespace())
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}
