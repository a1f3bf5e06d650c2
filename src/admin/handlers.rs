use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{auth::StaffUser, error::ApiError, state::AppState, users::repo_types::User};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user))
}

/// Every account, oldest first. Password hashes are never serialized.
#[instrument(skip(state, staff))]
pub async fn list_users(
    State(state): State<AppState>,
    staff: StaffUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list_users().await?;
    info!(staff_id = %staff.0.id, count = users.len(), "admin user listing");
    Ok(Json(users))
}

#[instrument(skip(state, _staff))]
pub async fn get_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let not_found = || ApiError::NotFound("User not found".into());
    let id: Uuid = id.parse().map_err(|_| not_found())?;
    state
        .users
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{testing::TestApp, users::services::create_superuser};

    async fn staff_token(app: &TestApp) -> String {
        create_superuser(app.state.users.as_ref(), "admin@example.com", "adminpass")
            .await
            .unwrap();
        let (status, body) = app
            .post(
                "/users/token",
                None,
                json!({ "email": "admin@example.com", "password": "adminpass" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn regular_users_are_forbidden() {
        let app = TestApp::new();
        let (status, _) = app.get("/admin/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = app.signup("test@example.com", "testpass").await;
        let (status, body) = app.get("/admin/users", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn staff_lists_users_without_hashes() {
        let app = TestApp::new();
        let admin = staff_token(&app).await;
        app.signup("test@example.com", "testpass").await;

        let (status, body) = app.get("/admin/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["email"], "admin@example.com");
        assert_eq!(users[0]["is_superuser"], true);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));

        let id = users[1]["id"].as_str().unwrap();
        let (status, one) = app.get(&format!("/admin/users/{id}"), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["email"], "test@example.com");
        assert!(one["last_login"].is_string());

        let (status, _) = app.get("/admin/users/not-a-uuid", Some(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
