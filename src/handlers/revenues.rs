// Financials API - Revenue handlers
// Revenue entries are immutable once created: list, create and delete only.

use axum::extract::{Path, State};
use axum::response::Json;
use tracing::{info, instrument, warn};

use super::{storage_failure, AppState, Deleted};
use crate::db::Filter;
use crate::error::{ApiError, JsonBody};
use crate::models::{Record, Revenue};

/// GET /revenues - All revenue entries, newest first
#[instrument(skip_all)]
pub async fn list_revenues(State(state): State<AppState>) -> Result<Json<Vec<Revenue>>, ApiError> {
    info!("Fetching all revenue entries");

    let revenues = state
        .revenues
        .list(Filter::all())
        .await
        .map_err(storage_failure("Failed to fetch revenues"))?;

    info!(count = revenues.len(), "Found revenue entries");
    Ok(Json(revenues))
}

/// POST /revenues
#[instrument(skip_all)]
pub async fn create_revenue(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Revenue>, ApiError> {
    info!(?body, "Creating revenue entry");

    let revenue = state
        .revenues
        .create(body)
        .await
        .map_err(storage_failure("Failed to create revenue"))?;

    info!(id = revenue.id(), "Revenue created");
    Ok(Json(revenue))
}

/// DELETE /revenues/:id
#[instrument(skip(state))]
pub async fn delete_revenue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    info!("Deleting revenue entry");

    let deleted = state
        .revenues
        .delete(id)
        .await
        .map_err(storage_failure("Failed to delete revenue"))?;

    if deleted.is_none() {
        warn!("Revenue entry not found");
        return Err(ApiError::NotFound(Revenue::LABEL));
    }

    info!("Revenue deleted");
    Ok(Json(Deleted::new()))
}
