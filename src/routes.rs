// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, pool},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Mounts the exam and pool sub-routers behind bearer authentication.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool, Config, Pool clock).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/submit", post(exam::submit_answers))
        .route("/{id}/questions", get(exam::list_questions))
        .route("/{id}/score", get(exam::get_score))
        .route("/{id}/solutions", get(exam::view_solutions))
        .route("/{id}/leaderboard", get(exam::get_leaderboard));

    let pool_routes = Router::new()
        .route("/question", get(pool::get_question))
        .route("/answer", post(pool::submit_answer))
        .route("/status", get(pool::get_status))
        .route("/leaderboard", get(pool::get_leaderboard));

    let api_routes = Router::new()
        .nest("/exams", exam_routes)
        .nest("/pool", pool_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
