use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::auth::credentials;
use crate::auth::middleware::JwtSecret;
use crate::state::AppState;
use crate::users::crud as user_crud;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 requests per minute per IP on credential endpoints
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Credential routes with rate limiting
    let auth_routes = Router::new()
        .route(
            "/api/auth/register",
            axum::routing::post(credentials::register),
        )
        .route("/api/auth/login", axum::routing::post(credentials::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Authenticated routes (JWT required — Claims extractor validates token)
    let authenticated_routes = Router::new()
        .route(
            "/api/auth/user",
            axum::routing::get(credentials::current_user),
        )
        .route(
            "/api/users/profile",
            axum::routing::get(user_crud::get_profile),
        );

    // Admin user management.
    // Note: /api/users/profile above MUST be registered before /api/users/{id}
    // to avoid path param conflict.
    let user_routes = Router::new()
        .route("/api/users", axum::routing::get(user_crud::list_users))
        .route("/api/users", axum::routing::post(user_crud::create_user))
        .route("/api/users/{id}", axum::routing::put(user_crud::update_user))
        .route(
            "/api/users/{id}",
            axum::routing::delete(user_crud::delete_user),
        );

    // WebSocket signaling endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(authenticated_routes)
        .merge(user_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
