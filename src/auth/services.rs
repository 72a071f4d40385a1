use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};

use super::{
    claims::Claims,
    jwt::JwtKeys,
    password::{hash_password, verify_decoy, verify_password},
};
use crate::{
    error::{AppError, AuthError},
    users::{
        repo::UserStore,
        repo_types::{NewUser, ProfileUpdate, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates an account and returns it with a fresh token.
pub async fn register(
    store: &dyn UserStore,
    keys: &JwtKeys,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(User, String), AppError> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Name, email and password are required".into(),
        ));
    }
    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if store.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(password)?;
    // create() re-checks uniqueness, covering a concurrent sign-up.
    let user = store
        .create(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await?;

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Checks credentials. Unknown email and wrong password produce the same error.
pub async fn authenticate(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<(User, String), AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    }

    let Some(user) = store.find_by_email(email).await? else {
        verify_decoy(password);
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    let ok = verify_password(password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "stored password hash unreadable");
        AppError::Internal(e)
    })?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = keys.sign(&user)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((user, token))
}

pub fn validate_token(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AuthError::InvalidToken.into()
    })
}

pub async fn current_user(store: &dyn UserStore, claims: &Claims) -> Result<User, AppError> {
    store.find_by_id(claims.id).await?.ok_or_else(|| {
        warn!(user_id = %claims.id, "token refers to missing user");
        AppError::NotFound("User not found".into())
    })
}

pub async fn update_profile(
    store: &dyn UserStore,
    claims: &Claims,
    mut update: ProfileUpdate,
) -> Result<User, AppError> {
    if let Some(name) = update.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }
    }
    let user = store.update_profile(claims.id, update).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}
