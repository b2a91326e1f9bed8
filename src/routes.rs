// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, exam, notification, paper, profile, question, report},
    state::AppState,
    utils::{
        headers::security_headers,
        jwt::{auth_middleware, faculty_middleware, student_middleware},
    },
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, questions, papers, exams, notifications).
/// * Applies global middleware (Trace, CORS, security headers).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let question_routes = Router::new()
        .route(
            "/",
            get(question::list_questions).post(question::create_question),
        )
        .route(
            "/{id}",
            put(question::update_question).delete(question::delete_question),
        )
        .layer(middleware::from_fn(faculty_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let paper_routes = Router::new()
        .route("/", get(paper::list_papers).post(paper::create_paper))
        .route("/wizard", post(paper::create_paper_wizard))
        .route(
            "/{id}",
            get(paper::get_paper)
                .put(paper::update_paper)
                .delete(paper::delete_paper),
        )
        .layer(middleware::from_fn(faculty_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // GET /exams serves both roles, so create_exam carries its own role
    // check instead of a router-level faculty gate.
    let exam_routes = Router::new()
        .route("/", get(exam::list_exams).post(exam::create_exam))
        .route(
            "/{id}",
            get(exam::get_exam)
                .put(exam::update_exam)
                .delete(exam::delete_exam),
        )
        .route("/{id}/results", get(attempt::exam_results))
        .merge(
            Router::new()
                .route("/{id}/submit", post(attempt::submit_exam))
                .layer(middleware::from_fn(student_middleware)),
        )
        .merge(
            Router::new()
                .route("/{id}/analytics", get(report::exam_analytics))
                .layer(middleware::from_fn(faculty_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let student_routes = Router::new()
        .route("/progress", get(report::student_progress))
        .layer(middleware::from_fn(student_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let notification_routes = Router::new()
        .route("/", get(notification::list_notifications))
        .route("/{id}/read", post(notification::mark_read))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let me_routes = Router::new()
        .route("/", get(profile::get_me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/questions", question_routes)
        .nest("/api/v1/papers", paper_routes)
        .nest("/api/v1/exams", exam_routes)
        .nest("/api/v1/student", student_routes)
        .nest("/api/v1/notifications", notification_routes)
        .nest("/api/v1/me", me_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}
