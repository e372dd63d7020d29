//! Vehicle Auction Core
//!
//! The real-time bidding core for the vehicle auction platform: durable
//! auction/bid state with optimistic concurrency, bid validation and
//! commit, scheduled lifecycle transitions, anti-snipe extension, and
//! per-auction event fan-out.
//!
//! # Architecture
//!
//! - **Models**: the `Auction`/`Bid`/`AuctionEvent` data model
//! - **Store**: durable state and the OCC primitives everything else builds on
//! - **Engine**: bid validation, the commit loop, and the anti-snipe tail
//! - **Scheduler**: the `scheduled -> active -> ended` poll loop
//! - **Broadcast**: per-auction subscriber fan-out
//! - **Services**: the ingress contract mapping HTTP onto the engine
//! - **Handlers**: the axum transport

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use engine::{
    BidEngine,
    BidRequest,
};
pub use error::{
    BidError,
    ConfigError,
    StoreError,
};
pub use models::{
    Auction,
    AuctionEvent,
    AuctionStatus,
    Bid,
    BidOutcome,
};
pub use scheduler::LifecycleScheduler;
pub use store::AuctionStore;

/// Crate version, surfaced on `/healthz` or startup logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
