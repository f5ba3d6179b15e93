// Financials API - Resource Handlers
// One handler group per record kind. Each handler makes exactly one store
// call and maps its outcome to a response.

pub mod expenses;
pub mod revenues;
pub mod tasks;

use axum::response::{IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{DocumentStore, StoreError};
use crate::error::ApiError;
use crate::models::{Expense, Revenue, Task};
use crate::repository::Repository;

/// Shared application state: one repository per collection, all backed by
/// the same store handle
#[derive(Clone)]
pub struct AppState {
    pub tasks: Repository<Task>,
    pub revenues: Repository<Revenue>,
    pub expenses: Repository<Expense>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tasks: Repository::new(Arc::clone(&store)),
            revenues: Repository::new(Arc::clone(&store)),
            expenses: Repository::new(store),
        }
    }
}

/// Body of every successful delete
#[derive(Debug, Serialize)]
pub struct Deleted {
    message: &'static str,
}

impl Deleted {
    pub fn new() -> Self {
        Self { message: "Deleted" }
    }
}

impl Default for Deleted {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a store failure and turn it into a 500 with a fixed message
pub(crate) fn storage_failure(message: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |source| {
        tracing::error!(error = %source, "{message}");
        ApiError::Storage { message, source }
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// GET /health - Liveness check, never touches the store
pub async fn health_check() -> impl IntoResponse {
    Json(Health { status: "ok" })
}
