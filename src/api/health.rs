use actix_web::{HttpResponse, Responder, get, web};
use serde::Serialize;

use super::models::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    chain_id: String,
    length: u64,
}

#[get("/health/")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(HealthResponse {
        status: "up",
        chain_id: node.config().chain_id.clone(),
        length: node.stores().chain.length(),
    })
}
