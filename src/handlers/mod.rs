//! HTTP transport (spec.md §6): axum routes binding the wire contract onto
//! the Bid Engine, the Auction Store, and the Event Broadcaster.

mod auctions;
mod auth;
mod events;
mod health;
mod state;

use axum::{
    routing::{
        get,
        post,
    },
    Router,
};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/auctions/:id", get(auctions::get_auction))
        .route("/v1/auctions/:id/bids", get(auctions::get_bid_history).post(auctions::submit_bid))
        .route("/v1/auctions/:id/events", get(events::subscribe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
