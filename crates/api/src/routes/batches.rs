//! Batch registration and quantity-change endpoints.

use std::sync::Arc;

use adapters::UnitOfWorkFactory;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use domain::Command;
use serde::Deserialize;

use crate::error::ApiError;

use super::AppState;

#[derive(Deserialize)]
pub struct AddBatchRequest {
    pub reference: String,
    pub sku: String,
    pub qty: u32,
    #[serde(default)]
    pub eta: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ChangeQuantityRequest {
    pub qty: u32,
}

/// POST /batches — register a new stock batch.
#[tracing::instrument(skip(state, req), fields(reference = %req.reference, sku = %req.sku))]
pub async fn add_batch<F: UnitOfWorkFactory + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Json(req): Json<AddBatchRequest>,
) -> Result<StatusCode, ApiError> {
    let cmd = Command::create_batch(req.reference, req.sku, req.qty, req.eta);
    let mut uow = state.uow_factory.begin().await?;
    state.bus.handle(cmd.into(), &mut uow).await?;
    Ok(StatusCode::CREATED)
}

/// POST /batches/:reference/quantity — change a batch's purchased quantity.
///
/// Shrinking below the allocated quantity triggers reallocation of the
/// displaced orders before the call returns.
#[tracing::instrument(skip(state, req), fields(reference = %reference))]
pub async fn change_quantity<F: UnitOfWorkFactory + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Path(reference): Path<String>,
    Json(req): Json<ChangeQuantityRequest>,
) -> Result<StatusCode, ApiError> {
    let cmd = Command::change_batch_quantity(reference, req.qty);
    let mut uow = state.uow_factory.begin().await?;
    state.bus.handle(cmd.into(), &mut uow).await?;
    Ok(StatusCode::OK)
}
