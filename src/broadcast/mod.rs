//! Event Broadcaster (spec.md §4.E): per-auction subscriber fan-out with
//! bounded buffers and no head-of-line blocking across auctions.

mod registry;

pub use registry::{
    EventBroadcaster,
    Subscription,
};
