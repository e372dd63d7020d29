use std::{
    sync::Arc,
    time::Duration,
};

use crate::{
    broadcast::EventBroadcaster,
    engine::BidEngine,
    store::AuctionStore,
};

/// Shared application state threaded through every axum handler. Cheap to
/// clone — every field is an `Arc` (or `Copy`, for `bid_submit_timeout`).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub engine: Arc<BidEngine>,
    pub broadcaster: Arc<EventBroadcaster>,
    /// Cancellation-token budget applied to every `submit bid` request
    /// (spec.md §5), measured from the moment the handler picks it up.
    pub bid_submit_timeout: Duration,
}
