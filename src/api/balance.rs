use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse};

/// Balance as seen by the node, pending pool effects included.
#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;

    let (balance, role) = {
        let node = state.node.lock().expect("mutex poisoned");
        let ledger = &node.stores().ledger;
        (ledger.get_balance(&address), ledger.get_role(&address))
    };

    HttpResponse::Ok().json(BalanceResponse {
        address,
        balance,
        role,
    })
}
