use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument};

use crate::{
    config::AdminBootstrap,
    error::ApiError,
    users::{
        password::hash_password,
        repo::UserRepo,
        repo_types::{NewUser, User, UserChanges},
    },
};

pub const MIN_PASSWORD_LEN: usize = 5;

/// Optional profile fields accepted at creation.
#[derive(Debug, Clone, Default)]
pub struct UserExtras {
    pub first_name: String,
    pub last_name: String,
}

/// Canonical stored form of an email: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Create and persist a user. The email must be present; shape checks are the caller's job.
#[instrument(skip(repo, password, extra))]
pub async fn create_user(
    repo: &dyn UserRepo,
    email: &str,
    password: &str,
    extra: UserExtras,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::field("email", "Users must have an email address"));
    }
    let password_hash = hash_password(password)?;
    let user = repo
        .insert_user(NewUser {
            email,
            password_hash,
            first_name: extra.first_name,
            last_name: extra.last_name,
        })
        .await?;
    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

#[instrument(skip(repo, password))]
pub async fn create_superuser(
    repo: &dyn UserRepo,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = create_user(repo, email, password, UserExtras::default()).await?;
    let changes = UserChanges {
        is_staff: Some(true),
        is_superuser: Some(true),
        ..UserChanges::default()
    };
    let user = repo
        .update_user(user.id, changes)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} vanished during elevation", user.id))?;
    info!(user_id = %user.id, "user elevated to superuser");
    Ok(user)
}

/// Make sure the configured bootstrap account exists; existing accounts are left alone.
pub async fn ensure_superuser(repo: &dyn UserRepo, admin: &AdminBootstrap) -> Result<User, ApiError> {
    if let Some(existing) = repo.find_by_email(&normalize_email(&admin.email)).await? {
        info!(user_id = %existing.id, "bootstrap superuser already present");
        return Ok(existing);
    }
    create_superuser(repo, &admin.email, &admin.password).await
}

/// Apply profile changes requested by the user themselves; a new password is re-hashed.
pub async fn update_profile(
    repo: &dyn UserRepo,
    user_id: uuid::Uuid,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
) -> Result<User, ApiError> {
    if let Some(p) = &password {
        if p.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::field(
                "password",
                format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
            ));
        }
    }
    let password_hash = password.as_deref().map(hash_password).transpose()?;
    let changes = UserChanges {
        first_name,
        last_name,
        password_hash,
        ..UserChanges::default()
    };
    repo.update_user(user_id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::users::password::check_password;

    #[tokio::test]
    async fn create_user_with_email_successful() {
        let store = MemoryStore::new();
        let user = create_user(&store, "test@example.com", "TestPass123", UserExtras::default())
            .await
            .unwrap();

        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password_hash, "TestPass123");
        assert!(check_password("TestPass123", &user.password_hash).unwrap());
        assert!(user.is_active);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn new_user_email_normalized() {
        let store = MemoryStore::new();
        let user = create_user(&store, "test@EXAMPLE.COM", "test123", UserExtras::default())
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
    }

    #[tokio::test]
    async fn normalized_emails_collide() {
        let store = MemoryStore::new();
        create_user(&store, "Cook@Example.com", "test123", UserExtras::default())
            .await
            .unwrap();
        let err = create_user(&store, "cook@example.com", "other1", UserExtras::default())
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(fields) => assert!(fields.get("email").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_user_without_email_fails() {
        let store = MemoryStore::new();
        for email in ["", "   "] {
            let err = create_user(&store, email, "test123", UserExtras::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_new_superuser() {
        let store = MemoryStore::new();
        let user = create_superuser(&store, "admin@example.com", "root1234").await.unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);
        assert!(check_password("root1234", &user.password_hash).unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.is_staff && stored.is_superuser);
    }

    #[tokio::test]
    async fn ensure_superuser_is_idempotent() {
        let store = MemoryStore::new();
        let admin = AdminBootstrap {
            email: "Admin@Example.com".into(),
            password: "root1234".into(),
        };
        let first = ensure_superuser(&store, &admin).await.unwrap();
        let second = ensure_superuser(&store, &admin).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_profile_rehashes_password() {
        let store = MemoryStore::new();
        let user = create_user(&store, "a@example.com", "first1", UserExtras::default())
            .await
            .unwrap();
        let updated = update_profile(&store, user.id, Some("Ada".into()), None, Some("second2".into()))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert!(check_password("second2", &updated.password_hash).unwrap());
        assert!(!check_password("first1", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_profile_rejects_short_password() {
        let store = MemoryStore::new();
        let user = create_user(&store, "a@example.com", "first1", UserExtras::default())
            .await
            .unwrap();
        let err = update_profile(&store, user.id, None, None, Some("abc".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("test@example"));
        assert!(!is_valid_email("no at sign"));
    }
}
