//! Core data model for the bidding engine.
//!
//! - [`auction`]: the `Auction` aggregate, its status machine, and the
//!   tunables (`snipe_threshold`, `extension_step`, ...) carried on every row.
//! - [`bid`]: append-only `Bid` records and their outcomes.
//! - [`event`]: the broadcast event envelope shared by the scheduler, the bid
//!   engine, and the event broadcaster.

pub mod auction;
pub mod bid;
pub mod event;

pub use auction::{
    Auction,
    AuctionStatus,
};
pub use bid::{
    Bid,
    BidOutcome,
};
pub use event::AuctionEvent;
