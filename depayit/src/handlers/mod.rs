mod transactions;

use actix_web::{
    HttpRequest, HttpResponse, Responder, error::InternalError, get, http::StatusCode, web,
};
use serde_json::json;
pub use transactions::*;

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "Depayit API is running" }))
}

#[get("/api/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Registers every API route; shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_body_error))
        .service(index)
        .service(health)
        .service(create_transaction)
        .service(get_transaction)
        .service(simulate_payment)
        .service(update_shipping)
        .service(confirm_receipt);
}

/// Error response with a JSON `{ "detail": ... }` body.
pub(crate) fn json_error(status: StatusCode, detail: impl Into<String>) -> actix_web::Error {
    let detail = detail.into();
    let response = HttpResponse::build(status).json(json!({ "detail": detail }));
    InternalError::from_response(detail, response).into()
}

fn json_body_error(err: actix_web::error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected request body for {}: {}", req.path(), err);
    json_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {err}"))
}
