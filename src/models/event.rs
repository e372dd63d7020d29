//! Event envelope carried on the per-auction broadcast bus and serialized
//! onto the `SUBSCRIBE auction events` wire stream (spec.md §6).

use chrono::{
    DateTime,
    Utc,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    /// A bid was accepted and committed.
    BidUpdate {
        auction_id: Uuid,
        current_bid: Decimal,
        bid_count: i32,
        bidder_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// `scheduled -> active` transition.
    AuctionStarted {
        auction_id: Uuid,
        starts_at: DateTime<Utc>,
    },
    /// Anti-snipe extension applied.
    AuctionExtended {
        auction_id: Uuid,
        ends_at: DateTime<Utc>,
        extension_count: i32,
    },
    /// Close pipeline completed.
    AuctionEnded {
        auction_id: Uuid,
        winner_id: Option<Uuid>,
        winning_bid: Option<Decimal>,
    },
    /// Emitted to every open subscriber on graceful shutdown.
    ServerClosing,
}

impl AuctionEvent {
    /// The auction this event belongs to, or `None` for the broadcast-wide
    /// shutdown notice.
    pub fn auction_id(&self) -> Option<Uuid> {
        match self {
            AuctionEvent::BidUpdate {
                auction_id, ..
            }
            | AuctionEvent::AuctionStarted {
                auction_id, ..
            }
            | AuctionEvent::AuctionExtended {
                auction_id, ..
            }
            | AuctionEvent::AuctionEnded {
                auction_id, ..
            } => Some(*auction_id),
            AuctionEvent::ServerClosing => None,
        }
    }
}
