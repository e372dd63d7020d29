//! Bid Engine (spec.md §4.B) and its anti-snipe tail (spec.md §4.D).

mod authorizer;
mod bid_engine;
mod extender;
mod locks;

pub use authorizer::{
    AlwaysAuthorized,
    BidAuthorizer,
};
pub use bid_engine::{
    Accepted,
    BidEngine,
    BidRequest,
};
