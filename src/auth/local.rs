use anyhow::Result;

use super::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::{
    storage::Storage,
    types::{normalize_email, FitnessError, User},
};

/// Creates a local account. Emails are unique across local and Google users.
pub fn register<S: Storage + ?Sized>(
    storage: &S,
    email: &str,
    username: &str,
    password: &str,
) -> Result<User> {
    let email = normalize_email(email);
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FitnessError::PasswordTooShort(MIN_PASSWORD_LEN).into());
    }
    if storage.find_user_by_email(&email)?.is_some() {
        return Err(FitnessError::EmailTaken(email).into());
    }
    let username = match username.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        name => name.to_string(),
    };
    let user = User::new_local(&email, &username, hash_password(password));
    storage.save_user(&user)?;
    log::info!("👤 Registered local user {}", user.email);
    Ok(user)
}

pub fn authenticate<S: Storage + ?Sized>(storage: &S, email: &str, password: &str) -> Result<User> {
    let user = storage
        .find_user_by_email(&normalize_email(email))?
        .ok_or(FitnessError::InvalidCredentials)?;
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(FitnessError::InvalidCredentials.into());
    };
    if !verify_password(password, hash)? {
        return Err(FitnessError::InvalidCredentials.into());
    }
    Ok(user)
}
