use std::io;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{info, warn};

use delta_chain::api::{self, AppState};
use delta_chain::wallet::KeyPair;
use delta_chain::{ChainConfig, Node, NodeConfig};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = ChainConfig::from_env().map_err(io::Error::other)?;
    let settings = NodeConfig::from_env().map_err(io::Error::other)?;

    let keys = match &settings.private_key {
        Some(secret) => KeyPair::from_secret_hex(secret).map_err(io::Error::other)?,
        None => {
            let keys = KeyPair::generate();
            warn!("NODE_PRIVATE_KEY not set, using ephemeral key {}", keys.address());
            keys
        }
    };

    let host = settings.host.clone();
    let port = settings.port;
    let tick_every = Duration::from_secs(settings.tick_interval_secs.max(1));

    let node = Node::new(config, settings, keys).map_err(io::Error::other)?;
    let state = web::Data::new(AppState::new(node));

    let ticker = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(tick_every);
        loop {
            interval.tick().await;
            let effects = {
                let mut node = ticker.node.lock().expect("mutex poisoned");
                node.tick(api::unix_now());
                node.drain_outbox()
            };
            ticker.route(effects);
        }
    });

    info!("starting delta_chain node at http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
