use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};

use super::models::{AppState, NewTxResponse, PoolResponse, TransferRequest};
use super::{error_response, unix_now};
use crate::transaction::{Action, SignedTransaction, Transaction, Transfer};
use crate::wallet::{KeyPair, pubkey_to_address_hex};

/// Submit a signed transaction: admit it to the pool and gossip it.
#[post("/tx/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<SignedTransaction>,
) -> impl Responder {
    let transaction = body.into_inner();
    debug!("POST /tx/ - from {}", transaction.authority);
    submit(&state, transaction)
}

/// Dev helper: build and sign a transfer with the given key, then submit it.
#[post("/tx/transfer/")]
pub async fn post_transfer(
    state: web::Data<AppState>,
    body: web::Json<TransferRequest>,
) -> impl Responder {
    let body = body.into_inner();
    let keys = match KeyPair::from_secret_hex(&body.private_key) {
        Ok(keys) => keys,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };

    let to = match pubkey_to_address_hex(&body.to) {
        Ok(address) => address,
        Err(err) => return HttpResponse::BadRequest().body(format!("recipient: {err}")),
    };

    let now = unix_now();
    let lifetime = match body.lifetime_secs {
        Some(secs) => secs,
        None => state.node.lock().expect("mutex poisoned").config().transaction_lifetime,
    };
    let Some(expiry) = now.checked_add(lifetime) else {
        return HttpResponse::BadRequest().body(format!("lifetime {lifetime}s out of range"));
    };
    let transaction = SignedTransaction::sign(
        Transaction {
            action: Action::Transfer(Transfer {
                from: keys.address().to_string(),
                to,
                amount: body.amount,
                message: body.message,
            }),
            fee: body.fee,
            creation: now,
            expiry,
        },
        &keys,
    );
    submit(&state, transaction)
}

fn submit(state: &AppState, transaction: SignedTransaction) -> HttpResponse {
    let (result, effects) = {
        let mut node = state.node.lock().expect("mutex poisoned");
        let result = node.submit_transaction(transaction, unix_now());
        (result, node.drain_outbox())
    };
    state.route(effects);

    match result {
        Ok(hash) => {
            info!("POST /tx/ - {hash} accepted");
            HttpResponse::Ok().json(NewTxResponse { hash })
        }
        Err(err) => {
            warn!("POST /tx/ - rejected: {err}");
            error_response(&err)
        }
    }
}

/// Pool contents in admission order (hashes only).
#[get("/pool/")]
pub async fn get_pool(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    let pool = &node.stores().pool;
    HttpResponse::Ok().json(PoolResponse {
        size: pool.len(),
        transactions: pool.get_keys(),
    })
}
