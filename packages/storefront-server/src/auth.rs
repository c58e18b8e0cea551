//! Accounts: password hashing, registration, login and the bearer-token
//! extractors used by protected routes.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use storefront_storage::domain::{NewUser, Session, StorefrontStore, User};
use storefront_storage::ErrorKind;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::forms::{FormErrors, LoginForm, RegistrationForm};
use crate::state::AppState;

pub fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hex SHA-256 of `salt || password`
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(user: &User, password: &str) -> bool {
    hash_password(password, &user.salt) == user.password_hash
}

pub async fn register(store: &dyn StorefrontStore, form: &RegistrationForm) -> Result<User> {
    form.validate().into_result()?;

    let salt = generate_salt();
    let new_user = NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password_hash: hash_password(&form.password1, &salt),
        salt,
    };

    match store.create_user(&new_user).await {
        Ok(user) => {
            info!("Registered user {} ({})", user.username, user.id);
            Ok(user)
        }
        Err(e) if matches!(e.kind, ErrorKind::Conflict) => {
            let mut errors = FormErrors::new();
            errors.add("username", "A user with that username already exists.");
            Err(errors.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(
    store: &dyn StorefrontStore,
    form: &LoginForm,
    ttl: chrono::Duration,
) -> Result<(User, Session)> {
    form.validate().into_result()?;

    let user = store
        .user_by_username(form.username.trim())
        .await?
        .filter(|user| verify_password(user, &form.password))
        .ok_or(ServerError::InvalidCredentials)?;

    let session = Session::new(generate_token(), user.id, ttl);
    store.create_session(&session).await?;

    info!("User {} logged in", user.username);
    Ok((user, session))
}

/// Resolve a session token to its user
///
/// Expired sessions are deleted on sight.
pub async fn authenticate(store: &dyn StorefrontStore, token: &str) -> Result<User> {
    let session = store
        .session(token)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if session.is_expired(Utc::now()) {
        debug!("Session for user {} expired", session.user_id);
        store.delete_session(token).await?;
        return Err(ServerError::Unauthorized);
    }

    match store.user(session.user_id).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_not_found() => Err(ServerError::Unauthorized),
        Err(e) => Err(e.into()),
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Authenticated user; rejects with 401
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(&parts.headers).ok_or(ServerError::Unauthorized)?;
        let user = authenticate(state.store.as_ref(), &token).await?;
        Ok(CurrentUser { user, token })
    }
}

/// Authenticated user if any; never rejects
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        match authenticate(state.store.as_ref(), &token).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(e) => {
                debug!("Ignoring credentials: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use storefront_storage::domain::AccountStore;
    use storefront_storage::SqliteStorefrontStore;

    fn registration(username: &str, password: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let a = hash_password("secret", "salt-a");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_password("secret", "salt-a"));
        assert_ne!(a, hash_password("secret", "salt-b"));
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let store = SqliteStorefrontStore::in_memory().unwrap();

        let user = register(&store, &registration("alice", "correct-horse"))
            .await
            .unwrap();
        assert!(verify_password(&user, "correct-horse"));
        assert!(!verify_password(&user, "wrong-horse"));

        let form = LoginForm {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
        };
        let (logged_in, session) = login(&store, &form, chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = authenticate(&store, &session.token).await.unwrap();
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_is_form_error() {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        register(&store, &registration("bob", "correct-horse"))
            .await
            .unwrap();

        let err = register(&store, &registration("bob", "other-horse-1"))
            .await
            .unwrap_err();
        match err {
            ServerError::InvalidForm(errors) => assert!(errors.get("username").is_some()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        register(&store, &registration("carol", "correct-horse"))
            .await
            .unwrap();

        for (username, password) in [("carol", "nope-nope"), ("nobody", "correct-horse")] {
            let form = LoginForm {
                username: username.to_string(),
                password: password.to_string(),
            };
            assert!(matches!(
                login(&store, &form, chrono::Duration::hours(1)).await,
                Err(ServerError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_deleted() {
        let store = SqliteStorefrontStore::in_memory().unwrap();
        let user = register(&store, &registration("dave", "correct-horse"))
            .await
            .unwrap();

        let session = Session::new("stale", user.id, chrono::Duration::seconds(-1));
        store.create_session(&session).await.unwrap();

        assert!(matches!(
            authenticate(&store, "stale").await,
            Err(ServerError::Unauthorized)
        ));
        assert!(store.session("stale").await.unwrap().is_none());
    }
}
