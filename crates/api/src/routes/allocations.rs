//! Allocation endpoints: dispatch the command, query the read model.

use std::sync::Arc;

use adapters::UnitOfWorkFactory;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::Command;
use serde::{Deserialize, Serialize};
use views::Allocation;

use crate::error::ApiError;

use super::AppState;

#[derive(Deserialize)]
pub struct AllocateRequest {
    pub orderid: String,
    pub sku: String,
    pub qty: u32,
}

#[derive(Serialize)]
pub struct AllocateResponse {
    /// Batch the line was allocated to; `null` when out of stock.
    pub batchref: Option<String>,
}

/// POST /allocations — allocate an order line.
#[tracing::instrument(skip(state, req), fields(orderid = %req.orderid, sku = %req.sku))]
pub async fn allocate<F: UnitOfWorkFactory + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Json(req): Json<AllocateRequest>,
) -> Result<(StatusCode, Json<AllocateResponse>), ApiError> {
    let cmd = Command::allocate(req.orderid, req.sku, req.qty);
    let mut uow = state.uow_factory.begin().await?;
    let results = state.bus.handle(cmd.into(), &mut uow).await?;

    let batchref = results
        .into_iter()
        .next()
        .flatten()
        .map(|reference| reference.to_string());
    Ok((StatusCode::ACCEPTED, Json(AllocateResponse { batchref })))
}

/// GET /allocations/:orderid — where did this order get allocated?
#[tracing::instrument(skip(state))]
pub async fn list_for_order<F: UnitOfWorkFactory + 'static>(
    State(state): State<Arc<AppState<F>>>,
    Path(orderid): Path<String>,
) -> Result<Json<Vec<Allocation>>, ApiError> {
    let rows = state
        .allocations
        .allocations(&OrderId::from(orderid.as_str()))
        .await;
    if rows.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No allocations for order {orderid}"
        )));
    }
    Ok(Json(rows))
}
