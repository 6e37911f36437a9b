mod balance;
mod chain;
mod health;
pub mod models;
mod p2p;
mod tx;
mod wallet;

use actix_web::HttpResponse;
use actix_web::web::{self, ServiceConfig};

use crate::error::ChainError;

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::get_header)
            .service(balance::get_balance)
            .service(tx::get_pool)
            .service(tx::post_transfer)
            .service(tx::post_transaction)
            .service(wallet::create_wallet)
            .service(p2p::join)
            .service(p2p::leave)
            .service(p2p::get_outbox)
            .service(p2p::deliver),
    );
}

/// Wall clock in unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn error_response(err: &ChainError) -> HttpResponse {
    match err {
        ChainError::DuplicateSubmission(_) => HttpResponse::Conflict().body(err.to_string()),
        _ => HttpResponse::BadRequest().body(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test, web};
    use serde_json::{Value, json};

    use super::{AppState, init_routes};
    use crate::config::{ChainConfig, NodeConfig};
    use crate::message::Message;
    use crate::node::Node;
    use crate::wallet::KeyPair;

    fn state(funded: &KeyPair) -> web::Data<AppState> {
        let config = ChainConfig {
            genesis_allocations: vec![(funded.address().to_string(), 1_000)],
            ..ChainConfig::default()
        };
        let node = Node::new(config, NodeConfig::default(), KeyPair::generate()).unwrap();
        web::Data::new(AppState::new(node))
    }

    #[actix_web::test]
    async fn health_and_chain_summary() {
        let app = test::init_service(
            App::new()
                .app_data(state(&KeyPair::generate()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "up");
        assert_eq!(body["chain_id"], ChainConfig::default().chain_id);
        assert_eq!(body["length"], 1);

        let req = test::TestRequest::get().uri("/api/v1/chain/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["length"], 1);
        assert_eq!(body["head"]["block_number"], 0);
        assert_eq!(body["sync_state"], "idle");

        let req = test::TestRequest::get().uri("/api/v1/headers/7/").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn transfer_is_pooled_and_queued_for_peers() {
        let keys = KeyPair::generate();
        let receiver = KeyPair::generate();
        let app = test::init_service(App::new().app_data(state(&keys)).configure(init_routes)).await;

        let req = test::TestRequest::post().uri("/api/v1/p2p/p/join/").to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/api/v1/tx/transfer/")
            .set_json(json!({
                "private_key": keys.secret_hex(),
                "to": receiver.address().to_uppercase(),
                "amount": 10,
                "fee": 1,
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let hash = body["hash"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri("/api/v1/pool/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["size"], 1);
        assert_eq!(body["transactions"][0], hash.as_str());

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/balance/{}/", receiver.address()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["balance"], 10);

        let req = test::TestRequest::get().uri("/api/v1/p2p/p/outbox/").to_request();
        let queued: Vec<Message> = test::call_and_read_body_json(&app, req).await;
        assert!(matches!(queued.as_slice(), [Message::Broadcast { echoes: 2, .. }]));

        let req = test::TestRequest::get().uri("/api/v1/p2p/p/outbox/").to_request();
        let queued: Vec<Message> = test::call_and_read_body_json(&app, req).await;
        assert!(queued.is_empty());
    }

    #[actix_web::test]
    async fn bad_transfers_are_rejected() {
        let keys = KeyPair::generate();
        let to = KeyPair::generate().address().to_string();
        let app = test::init_service(App::new().app_data(state(&keys)).configure(init_routes)).await;

        let rejected = [
            json!({ "private_key": keys.secret_hex(), "to": to, "amount": 5_000 }),
            json!({ "private_key": "zz", "to": to, "amount": 1 }),
            json!({ "private_key": keys.secret_hex(), "to": "receiver", "amount": 1 }),
            json!({
                "private_key": keys.secret_hex(),
                "to": to,
                "amount": 1,
                "lifetime_secs": i64::MAX,
            }),
        ];
        for body in rejected {
            let req = test::TestRequest::post()
                .uri("/api/v1/tx/transfer/")
                .set_json(&body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), 400, "{body}");
        }

        let req = test::TestRequest::get().uri("/api/v1/pool/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["size"], 0);
    }

    #[actix_web::test]
    async fn new_wallet_can_sign_transfers() {
        let app = test::init_service(
            App::new()
                .app_data(state(&KeyPair::generate()))
                .configure(init_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/wallet/new/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let keys = KeyPair::from_secret_hex(body["private_key"].as_str().unwrap()).unwrap();
        assert_eq!(body["address"], keys.address());
    }

    #[actix_web::test]
    async fn only_joined_peers_may_deliver() {
        let app = test::init_service(
            App::new()
                .app_data(state(&KeyPair::generate()))
                .configure(init_routes),
        )
        .await;
        let request = Message::SyncRequest {
            block_number: 0,
            c_sum: 0,
        };

        let req = test::TestRequest::post()
            .uri("/api/v1/p2p/q/")
            .set_json(&request)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::post().uri("/api/v1/p2p/q/join/").to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/p2p/q/")
            .set_json(&request)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 202);

        // not ahead, so nothing to answer
        let req = test::TestRequest::get().uri("/api/v1/p2p/q/outbox/").to_request();
        let queued: Vec<Message> = test::call_and_read_body_json(&app, req).await;
        assert!(queued.is_empty());
    }
}
