// Financials API - Expense handlers
// Same surface as revenues: no update route.

use axum::extract::{Path, State};
use axum::response::Json;
use tracing::{info, instrument, warn};

use super::{storage_failure, AppState, Deleted};
use crate::db::Filter;
use crate::error::{ApiError, JsonBody};
use crate::models::{Expense, Record};

/// GET /expenses - All expense entries, newest first
#[instrument(skip_all)]
pub async fn list_expenses(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, ApiError> {
    info!("Fetching all expense entries");

    let expenses = state
        .expenses
        .list(Filter::all())
        .await
        .map_err(storage_failure("Failed to fetch expenses"))?;

    info!(count = expenses.len(), "Found expense entries");
    Ok(Json(expenses))
}

/// POST /expenses
#[instrument(skip_all)]
pub async fn create_expense(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Expense>, ApiError> {
    info!(?body, "Creating expense entry");

    let expense = state
        .expenses
        .create(body)
        .await
        .map_err(storage_failure("Failed to create expense"))?;

    info!(id = expense.id(), "Expense created");
    Ok(Json(expense))
}

/// DELETE /expenses/:id
#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    info!("Deleting expense entry");

    let deleted = state
        .expenses
        .delete(id)
        .await
        .map_err(storage_failure("Failed to delete expense"))?;

    if deleted.is_none() {
        warn!("Expense entry not found");
        return Err(ApiError::NotFound(Expense::LABEL));
    }

    info!("Expense deleted");
    Ok(Json(Deleted::new()))
}
