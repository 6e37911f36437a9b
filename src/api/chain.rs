use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, ChainResponse, HeaderResponse};

/// Summary of the local chain and node.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let node = state.node.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        chain_id: node.config().chain_id.clone(),
        node_address: node.address().to_string(),
        length: node.stores().chain.length(),
        head: node.head().clone(),
        head_hash: node.head_hash().to_string(),
        pool_size: node.stores().pool.len(),
        peers: node.peer_ids(),
        sync_state: node.sync_state(),
    };
    HttpResponse::Ok().json(resp)
}

#[get("/headers/{number}/")]
pub async fn get_header(state: web::Data<AppState>, path: web::Path<(u64,)>) -> impl Responder {
    let number = path.into_inner().0;
    let node = state.node.lock().expect("mutex poisoned");
    let chain = &node.stores().chain;
    match (chain.at(number), chain.hash_at(number)) {
        (Some(signed_block), Some(hash)) => HttpResponse::Ok().json(HeaderResponse {
            hash: hash.to_string(),
            header: signed_block.header().clone(),
            transactions: signed_block.block.signed_transactions.len(),
        }),
        _ => HttpResponse::NotFound().body(format!("no block {number}")),
    }
}
