use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    api::{middleware::CurrentUser, response::ApiResponse},
    error::{AppError, AppResult},
    models::{AuthPayload, UserPayload},
    services::{auth::AuthService, validation},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    body: Option<Json<LoginRequest>>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    // A missing or unreadable body is treated as empty input, so the
    // failure surfaces as field errors in the envelope rather than a
    // bare extractor rejection.
    let req = body.map(|Json(req)| req).unwrap_or_default();

    // Validation runs before the credential check; only its failures are
    // reported field by field.
    let (email, password) = validation::validate_login(req.email.as_deref(), req.password.as_deref())
        .map_err(AppError::Validation)?;

    let auth = AuthService::new(state.users.clone(), state.tokens.clone());
    let (user, token) = auth.login(&email, &password).await?;

    Ok(Json(ApiResponse::ok(
        "Login successful",
        AuthPayload { user, token },
    )))
}

pub async fn get_user(
    current: Option<Extension<CurrentUser>>,
) -> AppResult<Json<ApiResponse<UserPayload>>> {
    let Extension(current) = current.ok_or(AppError::Unauthenticated)?;

    Ok(Json(ApiResponse::ok(
        "User retrieved successfully",
        UserPayload { user: current.user },
    )))
}

pub async fn logout(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
) -> AppResult<Json<ApiResponse<()>>> {
    // The guard has already run; a missing identity here means the
    // middleware state is inconsistent.
    let Extension(current) = current.ok_or(AppError::Unauthenticated)?;

    let auth = AuthService::new(state.users.clone(), state.tokens.clone());
    auth.logout(&current.token).await?;

    Ok(Json(ApiResponse::message_only("Logged out successfully")))
}

pub async fn refresh(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
) -> AppResult<Json<ApiResponse<AuthPayload>>> {
    let Extension(current) = current.ok_or(AppError::Unauthenticated)?;

    let auth = AuthService::new(state.users.clone(), state.tokens.clone());
    let token = auth.refresh(current.user.id, &current.token).await?;

    Ok(Json(ApiResponse::ok(
        "Token refreshed successfully",
        AuthPayload {
            user: current.user,
            token,
        },
    )))
}
