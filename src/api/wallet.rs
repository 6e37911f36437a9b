use actix_web::{HttpResponse, Responder, post};
use log::debug;
use serde::Serialize;

use crate::wallet::KeyPair;

#[derive(Serialize)]
struct NewWalletResponse {
    private_key: String,
    address: String,
}

/// Fresh keypair for clients; nothing is stored on the node. The address is
/// the compressed public key.
#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let keys = KeyPair::generate();
    debug!("POST /wallet/new/ - {}", keys.address());
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: keys.secret_hex(),
        address: keys.address().to_string(),
    })
}
