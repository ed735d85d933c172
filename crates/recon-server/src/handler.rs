use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use recon_cascade::{BlData, RepairReport};
use recon_store::{AvoirRepository, OrderRepository, SupplierRepository};
use recon_types::{
    Avoir, AvoirId, Delivery, DeliveryId, DeliveryStatus, Order, OrderId, StoreId, Supplier,
    SupplierId, VerificationResult,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyInvoiceBody {
    pub reference: String,
    pub store_id: u32,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBlBody {
    pub bl_number: String,
    pub store_id: u32,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: DeliveryStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierBody {
    pub name: String,
    #[serde(default)]
    pub automatic_reconciliation: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub store_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDeliveryBody {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub store_id: Option<u32>,
    #[serde(default)]
    pub bl_number: Option<String>,
    #[serde(default)]
    pub bl_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAvoirBody {
    #[serde(default)]
    pub store_id: Option<u32>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "recon-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn verify_invoice_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyInvoiceBody>,
) -> Json<VerificationResult> {
    let result = state
        .verifier
        .verify_invoice(
            &body.reference,
            StoreId(body.store_id),
            body.supplier_name.as_deref(),
            body.force_refresh,
        )
        .await;
    Json(result)
}

pub async fn verify_bl_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyBlBody>,
) -> Json<VerificationResult> {
    let result = state
        .verifier
        .verify_bl(
            None,
            StoreId(body.store_id),
            &body.bl_number,
            body.supplier_name.as_deref(),
            body.force_refresh,
        )
        .await;
    Json(result)
}

/// The body is optional; without one the delivery keeps its BL data.
pub async fn validate_delivery_handler(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
    body: Option<Json<BlData>>,
) -> ServerResult<StatusCode> {
    let bl = body.map(|Json(bl)| bl);
    state.deliveries.validate_delivery(&id, bl)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_delivery_status_handler(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
    Json(body): Json<StatusBody>,
) -> ServerResult<StatusCode> {
    state.deliveries.update_delivery_status(&id, body.status)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_delivery_handler(
    State(state): State<AppState>,
    Path(id): Path<DeliveryId>,
) -> ServerResult<StatusCode> {
    state.deliveries.delete_delivery(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn confirm_avoir_handler(
    State(state): State<AppState>,
    Path(id): Path<AvoirId>,
    body: Option<Json<ConfirmBody>>,
) -> ServerResult<Json<VerificationResult>> {
    let force_refresh = body.is_some_and(|Json(b)| b.force_refresh);
    let result = state.avoirs.confirm_with_ledger(&id, force_refresh).await?;
    Ok(Json(result))
}

pub async fn devalidate_avoir_handler(
    State(state): State<AppState>,
    Path(id): Path<AvoirId>,
) -> ServerResult<StatusCode> {
    state.avoirs.devalidate(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn repair_orders_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<RepairReport>> {
    Ok(Json(state.deliveries.repair_orders()?))
}

// ---------------------------------------------------------------------------
// Collaborator ingestion
// ---------------------------------------------------------------------------

pub async fn create_supplier_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateSupplierBody>,
) -> ServerResult<(StatusCode, Json<Supplier>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest("supplier name must not be empty".into()));
    }
    let supplier = Supplier::new(name, body.automatic_reconciliation);
    state.repo.save_supplier(&supplier)?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn create_order_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> ServerResult<(StatusCode, Json<Order>)> {
    require_supplier(&state, body.supplier_id)?;
    let order = Order::new(body.supplier_id, body.store_id.map(StoreId));
    state.repo.save_order(&order)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Goes through the delivery workflow, so linking a pending order plans it.
pub async fn create_delivery_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateDeliveryBody>,
) -> ServerResult<(StatusCode, Json<Delivery>)> {
    if let Some(order_id) = body.order_id {
        if state.repo.get_order(&order_id)?.is_none() {
            return Err(ServerError::NotFound(format!("order not found: {order_id}")));
        }
    }
    require_supplier(&state, body.supplier_id)?;

    let mut delivery = Delivery::planned(body.order_id, body.supplier_id);
    delivery.store_id = body.store_id.map(StoreId);
    if let Some(bl_number) = body.bl_number {
        delivery = delivery.with_bl(bl_number, body.bl_amount);
    }
    let delivery = state.deliveries.create_delivery(delivery)?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn create_avoir_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateAvoirBody>,
) -> ServerResult<(StatusCode, Json<Avoir>)> {
    require_supplier(&state, body.supplier_id)?;
    let mut avoir = Avoir::new(body.store_id.map(StoreId), body.reference);
    avoir.supplier_id = body.supplier_id;
    avoir.amount = body.amount;
    state.repo.save_avoir(&avoir)?;
    Ok((StatusCode::CREATED, Json(avoir)))
}

fn require_supplier(state: &AppState, supplier_id: Option<SupplierId>) -> ServerResult<()> {
    match supplier_id {
        Some(id) if state.repo.get_supplier(&id)?.is_none() => {
            Err(ServerError::NotFound(format!("supplier not found: {id}")))
        }
        _ => Ok(()),
    }
}
