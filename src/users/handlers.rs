use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{services as auth_services, AuthUser, CurrentUser},
    error::{ApiError, FieldErrors, JsonBody},
    state::AppState,
    users::{
        dto::{CreateUserRequest, PublicUser, RefreshRequest, TokenRequest, TokenResponse, UpdateMeRequest},
        services::{create_user, is_valid_email, normalize_email, update_profile, UserExtras, MIN_PASSWORD_LEN},
    },
};

const MAX_PERSON_NAME_LEN: usize = 150;
/// Width of the `users.email` column.
const MAX_EMAIL_LEN: usize = 255;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/create", post(register))
        .route("/users/token", post(token))
        .route("/users/token/refresh", post(refresh))
        .route("/users/me", get(get_me).patch(update_me))
}

fn check_person_name(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.chars().count() > MAX_PERSON_NAME_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_PERSON_NAME_LEN} characters."),
        );
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let mut errors = FieldErrors::new();

    let email = payload.email.as_deref().map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if email.chars().count() > MAX_EMAIL_LEN {
        errors.add(
            "email",
            format!("Ensure this field has no more than {MAX_EMAIL_LEN} characters."),
        );
    } else if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        errors.add("email", "Enter a valid email address.");
    }

    match payload.password.as_deref() {
        None | Some("") => errors.add("password", "This field is required."),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        ),
        Some(_) => {}
    }
    check_person_name("first_name", &payload.first_name, &mut errors);
    check_person_name("last_name", &payload.last_name, &mut errors);
    errors.into_result()?;

    let password = payload.password.unwrap_or_default();
    let extra = UserExtras {
        first_name: payload.first_name,
        last_name: payload.last_name,
    };
    let user = create_user(state.users.as_ref(), &email, &password, extra)
        .await
        .map_err(|e| {
            warn!(email = %email, error = %e, "registration rejected");
            e
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
        errors.add("email", "This field is required.");
    }
    if payload.password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let pair = auth_services::authenticate(
        state.users.as_ref(),
        &state.jwt,
        payload.email.as_deref().unwrap_or_default(),
        payload.password.as_deref().unwrap_or_default(),
    )
    .await?;

    Ok(Json(TokenResponse {
        token: pair.access,
        refresh_token: pair.refresh,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let pair = auth_services::refresh(state.users.as_ref(), &state.jwt, &payload.refresh_token).await?;
    Ok(Json(TokenResponse {
        token: pair.access,
        refresh_token: pair.refresh,
    }))
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<UpdateMeRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let mut errors = FieldErrors::new();
    if let Some(v) = &payload.first_name {
        check_person_name("first_name", v, &mut errors);
    }
    if let Some(v) = &payload.last_name {
        check_person_name("last_name", v, &mut errors);
    }
    errors.into_result()?;

    let user = update_profile(
        state.users.as_ref(),
        user_id,
        payload.first_name,
        payload.last_name,
        payload.password,
    )
    .await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(PublicUser::from(user)))
}
