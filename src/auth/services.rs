use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    users::{password::check_password, repo::UserRepo, services::normalize_email},
};

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

/// Access and refresh tokens issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_tokens(keys: &JwtKeys, user_id: Uuid) -> Result<TokenPair, ApiError> {
    Ok(TokenPair {
        access: keys.sign_access(user_id)?,
        refresh: keys.sign_refresh(user_id)?,
    })
}

/// Verify email + password and issue tokens.
///
/// Unknown email, wrong password and inactive accounts all produce the same
/// [`ApiError::Authentication`], so callers cannot tell which part was wrong.
#[instrument(skip(repo, keys, password))]
pub async fn authenticate(
    repo: &dyn UserRepo,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<TokenPair, ApiError> {
    let email = normalize_email(email);
    let Some(user) = repo.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Authentication(BAD_CREDENTIALS.into()));
    };

    if !check_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Authentication(BAD_CREDENTIALS.into()));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(ApiError::Authentication(BAD_CREDENTIALS.into()));
    }

    repo.record_login(user.id).await?;
    let tokens = issue_tokens(keys, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(tokens)
}

/// Trade a refresh token for a fresh pair, provided the account is still active.
pub async fn refresh(
    repo: &dyn UserRepo,
    keys: &JwtKeys,
    refresh_token: &str,
) -> Result<TokenPair, ApiError> {
    let claims = keys
        .verify_refresh(refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    let user = repo
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    issue_tokens(keys, user.id)
}
