//! HTTP API server with observability for the allocation service.
//!
//! Exposes batch registration, allocation, quantity changes, and the
//! allocations read-model query, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use adapters::{InMemoryStore, InMemoryUnitOfWorkFactory, TracingNotifications, UnitOfWorkFactory};
use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use views::AllocationsView;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<F: UnitOfWorkFactory + 'static>(
    state: Arc<AppState<F>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/batches", post(routes::batches::add_batch::<F>))
        .route(
            "/batches/{reference}/quantity",
            post(routes::batches::change_quantity::<F>),
        )
        .route("/allocations", post(routes::allocations::allocate::<F>))
        .route(
            "/allocations/{orderid}",
            get(routes::allocations::list_for_order::<F>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: in-memory persistence, tracing
/// notifications, and the production handler wiring.
///
/// PostgreSQL-backed units of work are wired the same way from a
/// `PostgresUnitOfWorkFactory`; the adapters integration tests cover them.
pub fn create_default_state() -> Arc<AppState<InMemoryUnitOfWorkFactory>> {
    let view = AllocationsView::new();
    let notifications = Arc::new(TracingNotifications::new());
    let bus = messagebus::message_bus(view.clone(), notifications);
    let uow_factory = InMemoryUnitOfWorkFactory::new(InMemoryStore::new());

    Arc::new(AppState {
        bus,
        uow_factory,
        allocations: view,
    })
}
