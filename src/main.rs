use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contacts_backend::{
    app,
    config::Config,
    services::auth::hash_password,
    storage::postgres::{PgContactRepository, PgTokenStore, PgUserStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contacts_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!("Starting server in {} mode", config.server.environment);

    // Initialize database pool
    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database_url())
        .await?;
    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    // Create app state
    let state = AppState {
        contacts: Arc::new(PgContactRepository::new(db.clone())),
        users: Arc::new(PgUserStore::new(db.clone())),
        tokens: Arc::new(PgTokenStore::new(db)),
        config: Arc::new(config.clone()),
    };

    seed_bootstrap_user(&state).await?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Seeds a single identity from the environment when the user table is
/// empty, so a fresh deployment has someone who can log in.
async fn seed_bootstrap_user(state: &AppState) -> anyhow::Result<()> {
    let Some(bootstrap) = state.config.auth.bootstrap.clone() else {
        return Ok(());
    };
    if state.users.count().await? > 0 {
        return Ok(());
    }

    let hash = hash_password(&bootstrap.password)?;
    state
        .users
        .insert(&bootstrap.name, &bootstrap.email, &hash)
        .await?;
    tracing::info!(email = %bootstrap.email, "Seeded bootstrap user");

    Ok(())
}
