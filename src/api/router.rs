use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use super::{handlers, middleware::auth_middleware};
use crate::AppState;

pub fn create_router(state: AppState) -> Router<AppState> {
    // Public routes
    let public_routes = Router::new().route("/login", post(handlers::auth::login));

    // Everything else sits behind the bearer-token guard
    let protected_routes = Router::new()
        .route("/user", get(handlers::auth::get_user))
        .route("/logout", post(handlers::auth::logout))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/contacts", get(handlers::contacts::list_contacts))
        .route("/contacts", post(handlers::contacts::create_contact))
        .route("/contacts/:id", get(handlers::contacts::get_contact))
        .route("/contacts/:id", put(handlers::contacts::update_contact))
        .route("/contacts/:id", patch(handlers::contacts::update_contact))
        .route("/contacts/:id", delete(handlers::contacts::delete_contact))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public_routes.merge(protected_routes).with_state(state)
}
