// Financials API - Router
// Method + path dispatch, plus the two layers every request passes through:
// permissive CORS and request tracing. JSON bodies are parsed by the
// `JsonBody` extractor on each body-taking route.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{expenses, health_check, revenues, tasks, AppState};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tasks", post(tasks::create_task))
        // One segment, two meanings: a person for GET, a task id for PUT/DELETE
        .route(
            "/tasks/:key",
            get(tasks::list_tasks)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/revenues",
            get(revenues::list_revenues).post(revenues::create_revenue),
        )
        .route("/revenues/:id", delete(revenues::delete_revenue))
        .route(
            "/expenses",
            get(expenses::list_expenses).post(expenses::create_expense),
        )
        .route("/expenses/:id", delete(expenses::delete_expense))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
