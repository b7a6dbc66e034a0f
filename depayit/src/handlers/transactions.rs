use actix_web::{Error, HttpResponse, get, http::StatusCode, post, web};
use chrono::{DateTime, Utc};
use common::{
    EscrowError, NewTransaction, ReleaseTrigger, ShippingInfo, Transaction, TransactionStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::json_error;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmReceipt {
    pub pin: String,
}

/// Public view of a transaction; the PIN hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub product: String,
    pub amount: f64,
    pub phone: String,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub shipping_info: Option<ShippingInfo>,
    pub auto_release_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_trigger: Option<ReleaseTrigger>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        TransactionResponse {
            id: tx.id,
            product: tx.product,
            amount: tx.amount,
            phone: tx.phone,
            description: tx.description,
            status: tx.status,
            created_at: tx.created_at,
            paid_at: tx.paid_at,
            shipped_at: tx.shipped_at,
            shipping_info: tx.shipping_info,
            auto_release_at: tx.auto_release_at,
            released_at: tx.released_at,
            release_trigger: tx.release_trigger,
        }
    }
}

fn escrow_error(tx_id: &str, err: EscrowError) -> Error {
    match err {
        EscrowError::NotFound(_) => {
            log::warn!("Transaction not found: {}", tx_id);
            json_error(StatusCode::NOT_FOUND, "Transaction not found.")
        }
        EscrowError::Validation(message) => {
            log::warn!("Rejected input for {}: {}", tx_id, message);
            json_error(StatusCode::UNPROCESSABLE_ENTITY, message)
        }
        EscrowError::InvalidPin(_) => {
            log::warn!("Invalid PIN supplied for transaction {}", tx_id);
            json_error(StatusCode::FORBIDDEN, "Invalid PIN.")
        }
        EscrowError::PinLocked(_) => {
            log::warn!("PIN confirmation locked for transaction {}", tx_id);
            json_error(
                StatusCode::LOCKED,
                "Too many failed PIN attempts. Funds will be released automatically.",
            )
        }
        err @ EscrowError::InvalidState { .. } => {
            log::warn!("{}", err);
            json_error(StatusCode::CONFLICT, err.to_string())
        }
        err @ (EscrowError::DuplicateId(_) | EscrowError::Storage(_)) => {
            log::error!("Transaction {} failed: {:#}", tx_id, anyhow::Error::from(err));
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process transaction. Please try again later.",
            )
        }
    }
}

#[post("/api/transactions")]
pub async fn create_transaction(
    data: web::Json<NewTransaction>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let created = app_state
        .escrow
        .create(data.into_inner())
        .await
        .map_err(|e| escrow_error("<new>", e))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Transaction created successfully",
        "link": app_state.payment_link(&created.id),
        "tx_id": created.id,
        "pin": created.pin,
    })))
}

#[get("/api/transactions/{tx_id}")]
pub async fn get_transaction(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let tx_id = path.into_inner();

    let tx = app_state
        .escrow
        .get(&tx_id)
        .await
        .map_err(|e| escrow_error(&tx_id, e))?;

    Ok(HttpResponse::Ok().json(TransactionResponse::from(tx)))
}

#[post("/api/transactions/{tx_id}/pay")]
pub async fn simulate_payment(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let tx_id = path.into_inner();

    let tx = app_state
        .escrow
        .mark_paid(&tx_id)
        .await
        .map_err(|e| escrow_error(&tx_id, e))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Payment received (simulation)",
        "status": tx.status,
        "paid_at": tx.paid_at,
    })))
}

#[post("/api/transactions/{tx_id}/shipment")]
pub async fn update_shipping(
    path: web::Path<String>,
    data: web::Json<ShippingInfo>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let tx_id = path.into_inner();

    let tx = app_state
        .escrow
        .attach_shipment(&tx_id, data.into_inner())
        .await
        .map_err(|e| escrow_error(&tx_id, e))?;

    let hours = app_state.escrow.auto_release_after().num_hours();
    Ok(HttpResponse::Ok().json(json!({
        "message": "Shipping details saved",
        "status": tx.status,
        "auto_release": format!("Funds release automatically in {hours} hours"),
        "auto_release_at": tx.auto_release_at,
    })))
}

#[post("/api/transactions/{tx_id}/confirm")]
pub async fn confirm_receipt(
    path: web::Path<String>,
    data: web::Json<ConfirmReceipt>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let tx_id = path.into_inner();

    let tx = app_state
        .escrow
        .confirm_receipt(&tx_id, &data.pin)
        .await
        .map_err(|e| escrow_error(&tx_id, e))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Receipt confirmed, funds released to seller",
        "status": tx.status,
        "released_at": tx.released_at,
    })))
}
