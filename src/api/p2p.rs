//! Pull-based peer transport. A peer joins, posts messages to the node and
//! polls its outbox for the replies and gossip queued for it.

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info};

use super::models::{AppState, JoinResponse};
use super::unix_now;
use crate::message::Message;

#[post("/p2p/{peer}/join/")]
pub async fn join(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let peer = path.into_inner().0;
    let joined = state
        .node
        .lock()
        .expect("mutex poisoned")
        .add_peer(&peer);
    state
        .outboxes
        .lock()
        .expect("mutex poisoned")
        .entry(peer.clone())
        .or_default();
    info!("PEER {peer} joined (new: {joined})");
    HttpResponse::Ok().json(JoinResponse { peer, joined })
}

#[post("/p2p/{peer}/leave/")]
pub async fn leave(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let peer = path.into_inner().0;
    let effects = {
        let mut node = state.node.lock().expect("mutex poisoned");
        node.remove_peer(&peer);
        node.drain_outbox()
    };
    state.route(effects);
    state.outboxes.lock().expect("mutex poisoned").remove(&peer);
    info!("PEER {peer} left");
    HttpResponse::Ok().finish()
}

/// Deliver one message from `peer`.
#[post("/p2p/{peer}/")]
pub async fn deliver(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    body: web::Json<Message>,
) -> impl Responder {
    let peer = path.into_inner().0;
    let message = body.into_inner();
    debug!("P2P {} from {peer}", message.name());

    let effects = {
        let mut node = state.node.lock().expect("mutex poisoned");
        if !node.peer_ids().contains(&peer) {
            return HttpResponse::Forbidden().body(format!("{peer} has not joined"));
        }
        node.handle_message(&peer, message, unix_now());
        node.drain_outbox()
    };
    state.route(effects);
    HttpResponse::Accepted().finish()
}

/// Drain everything queued for `peer`.
#[get("/p2p/{peer}/outbox/")]
pub async fn get_outbox(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let peer = path.into_inner().0;
    let mut outboxes = state.outboxes.lock().expect("mutex poisoned");
    match outboxes.get_mut(&peer) {
        Some(queue) => HttpResponse::Ok().json(std::mem::take(queue)),
        None => HttpResponse::NotFound().body(format!("{peer} has not joined")),
    }
}
