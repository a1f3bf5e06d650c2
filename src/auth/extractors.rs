use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::{Claims, JwtKeys, TokenKind};
use crate::{error::ApiError, state::AppState, users::repo_types::User};

/// Claims of a valid bearer access token on the request.
fn access_claims(parts: &Parts, keys: &JwtKeys) -> Result<Claims, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".into())
        })?;

    // Expect "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))?;

    let claims = keys.verify(token).map_err(|_| {
        warn!("invalid or expired token");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.kind != TokenKind::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }
    Ok(claims)
}

/// The active account behind the bearer access token.
///
/// A token outlives a deactivation, so the account is re-read on every
/// request; deleted or inactive accounts are rejected with 401.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, &JwtKeys::from_ref(state))?;
        match state.users.find_by_id(claims.sub).await? {
            Some(user) if user.is_active => Ok(CurrentUser(user)),
            Some(user) => {
                warn!(user_id = %user.id, "token presented for inactive account");
                Err(ApiError::Unauthorized("User inactive or deleted.".into()))
            }
            None => Err(ApiError::Unauthorized("User inactive or deleted.".into())),
        }
    }
}

/// Id of the authenticated caller; what catalog handlers scope by.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(AuthUser(user.id))
    }
}

/// An authenticated, active account with `is_staff` set.
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            warn!(user_id = %user.id, "non-staff user on admin endpoint");
            return Err(ApiError::Forbidden(
                "You do not have permission to perform this action.".into(),
            ));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, Request};
    use uuid::Uuid;

    use super::*;
    use crate::config::AppConfig;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/recipe/tags");
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[test]
    fn access_claims_requires_bearer_access_token() {
        let keys = JwtKeys::from_config(&AppConfig::for_tests().jwt);
        let user_id = Uuid::new_v4();
        let access = keys.sign_access(user_id).unwrap();
        let refresh = keys.sign_refresh(user_id).unwrap();

        let access_header = format!("Bearer {access}");
        let claims = access_claims(&parts_with(Some(access_header.as_str())), &keys).unwrap();
        assert_eq!(claims.sub, user_id);

        for header in [None, Some(access.as_str()), Some("Bearer nope")] {
            let err = access_claims(&parts_with(header), &keys).unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(_)));
        }
        let refresh_header = format!("Bearer {refresh}");
        let err = access_claims(&parts_with(Some(refresh_header.as_str())), &keys).unwrap_err();
        assert_eq!(err.to_string(), "Access token required");
    }
}
