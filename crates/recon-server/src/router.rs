use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Recon endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/verify/invoice", post(handler::verify_invoice_handler))
        .route("/v1/verify/bl", post(handler::verify_bl_handler))
        .route("/v1/suppliers", post(handler::create_supplier_handler))
        .route("/v1/orders", post(handler::create_order_handler))
        .route("/v1/deliveries", post(handler::create_delivery_handler))
        .route("/v1/avoirs", post(handler::create_avoir_handler))
        .route(
            "/v1/deliveries/:id/validate",
            post(handler::validate_delivery_handler),
        )
        .route(
            "/v1/deliveries/:id/status",
            put(handler::update_delivery_status_handler),
        )
        .route(
            "/v1/deliveries/:id",
            axum::routing::delete(handler::delete_delivery_handler),
        )
        .route("/v1/avoirs/:id/confirm", post(handler::confirm_avoir_handler))
        .route(
            "/v1/avoirs/:id/devalidate",
            post(handler::devalidate_avoir_handler),
        )
        .route(
            "/v1/maintenance/repair-orders",
            post(handler::repair_orders_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
