use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storefront_storage::domain::User;
use tracing::info;

use crate::auth::{self, CurrentUser};
use crate::error::Result;
use crate::extract::JsonBody;
use crate::forms::{LoginForm, RegistrationForm};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub user: User,
}

/// `POST /accounts/register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RegistrationForm>,
) -> Result<(StatusCode, Json<Registered>)> {
    let user = auth::register(state.store.as_ref(), &form).await?;
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            message: "Account created successfully",
            user,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct LoggedIn {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// `POST /accounts/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> Result<Json<LoggedIn>> {
    let (user, session) =
        auth::login(state.store.as_ref(), &form, state.config.session_ttl()).await?;
    Ok(Json(LoggedIn {
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

/// `POST /accounts/logout`
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Result<StatusCode> {
    state.store.delete_session(&current.token).await?;
    info!("User {} logged out", current.user.username);
    Ok(StatusCode::NO_CONTENT)
}
