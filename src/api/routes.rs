//! Router assembly.

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::api::{admin, auth, game, questions, shop, system};
use crate::config::ConfigError;
use crate::state::AppState;

/// Builds the full application router.
///
/// # Errors
///
/// Returns [`ConfigError`] if `client_origin` is not a valid header value.
#[instrument(skip(state))]
pub fn router(state: AppState, client_origin: &str) -> Result<Router, ConfigError> {
    let origin: HeaderValue = client_origin.parse().map_err(|e| {
        ConfigError::new(format!("Invalid client origin '{}': {}", client_origin, e))
    })?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let api = Router::new()
        .route("/auth/guest", post(auth::create_guest))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/questions", get(questions::list))
        .route("/questions/{id}", get(questions::get))
        .route("/game/questions", get(game::questions))
        .route("/game/submit_result", post(game::submit_result))
        .route("/game/history", get(game::history))
        .route("/game/results", get(game::history))
        .route("/game/stats", get(game::stats))
        .route(
            "/admin/questions",
            post(admin::create_question).get(admin::list_questions),
        )
        .route(
            "/admin/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/shop/items", get(shop::items))
        .route("/shop/purchase", post(shop::purchase))
        .route("/shop/purchases", get(shop::purchases))
        .route("/shop/inventory", get(shop::inventory));

    let app = Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .nest("/api", api)
        .fallback(system::not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!(origin = %client_origin, "Router built");
    Ok(app)
}
