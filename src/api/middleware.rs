use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::UserSummary, services::auth::AuthService, AppState};

/// Identity resolved by the guard, attached to the request for handlers.
/// The raw token is kept so logout/refresh can revoke exactly the
/// credential that was presented.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserSummary,
    pub token: String,
}

/// Authentication guard: runs before every protected handler, so no
/// business logic executes for unauthenticated requests.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .ok_or(AppError::MissingToken)?;

    let auth = AuthService::new(state.users.clone(), state.tokens.clone());
    let user = auth
        .resolve_identity(&token)
        .await?
        .ok_or(AppError::InvalidToken)?;

    request.extensions_mut().insert(CurrentUser {
        user: UserSummary::from(&user),
        token,
    });

    Ok(next.run(request).await)
}
