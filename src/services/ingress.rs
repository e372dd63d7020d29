//! Ingress Contract (spec.md §4.F): translates between the transport-facing
//! wire shapes and [`crate::engine::BidEngine`], and owns the stable
//! outcome/status-code mapping of spec.md §6.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{
    Deserialize,
    Serialize,
};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    engine::{
        BidEngine,
        BidRequest,
    },
    error::{
        BidError,
        ValidationReason,
    },
    store::AuctionStore,
};

#[derive(Debug, Deserialize)]
pub struct SubmitBidRequest {
    pub amount: Decimal,
}

/// `{ outcome, reason?, current_bid, bid_count, version }` (spec.md §6).
#[derive(Debug, Serialize)]
pub struct SubmitBidResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub current_bid: Option<Decimal>,
    pub bid_count: i32,
    pub version: i64,
}

/// Status code a transport should report for a resolved outcome (spec.md
/// §6). `499` (client closed request) is this crate's convention for
/// `Cancelled`; spec.md itself only enumerates the five listed codes.
pub fn status_for(err: Option<&BidError>) -> u16 {
    match err {
        None => 200,
        Some(BidError::Validation(ValidationReason::Unauthorized | ValidationReason::SelfBid)) => {
            403
        }
        Some(BidError::Validation(ValidationReason::AuctionClosed)) => 409,
        Some(BidError::Validation(_)) => 400,
        Some(BidError::Outbid) => 409,
        Some(BidError::Contention | BidError::Overloaded) => 429,
        Some(BidError::Cancelled) => 499,
        Some(BidError::Internal(_)) => 500,
    }
}

fn reason_for(err: &BidError) -> &'static str {
    match err {
        BidError::Validation(ValidationReason::AuctionNotOpen) => "AuctionNotOpen",
        BidError::Validation(ValidationReason::AuctionClosed) => "AuctionClosed",
        BidError::Validation(ValidationReason::SelfBid) => "SelfBid",
        BidError::Validation(ValidationReason::Unauthorized) => "Unauthorized",
        BidError::Validation(ValidationReason::MalformedAmount) => "MalformedAmount",
        BidError::Validation(ValidationReason::TooLow) => "TooLow",
        BidError::Validation(ValidationReason::TooHigh) => "TooHigh",
        BidError::Outbid => "Outbid",
        BidError::Contention => "Contention",
        BidError::Overloaded => "Overloaded",
        BidError::Cancelled => "Cancelled",
        BidError::Internal(_) => "Internal",
    }
}

fn outcome_label(err: &BidError) -> &'static str {
    match err {
        BidError::Outbid => "rejected",
        BidError::Validation(_) => "rejected",
        BidError::Contention => "contention",
        BidError::Overloaded => "overloaded",
        BidError::Cancelled => "rejected",
        BidError::Internal(_) => "rejected",
    }
}

/// Submit a bid through the engine and render the wire response, falling
/// back to a freshly reloaded snapshot for `current_bid`/`bid_count`/
/// `version` on a rejection (the engine only returns the post-commit
/// snapshot on acceptance).
///
/// `submit_timeout` is the cancellation-token budget of spec.md §5: the
/// deadline is computed from "now" at the point the request is handed to
/// the engine, so it covers the lock wait, the OCC loop, and nothing before
/// that (transport-level parsing, auth, etc. are not this budget's concern).
pub async fn submit_bid(
    engine: &BidEngine,
    store: &dyn AuctionStore,
    auction_id: Uuid,
    user_id: Uuid,
    amount: Decimal,
    submit_timeout: Duration,
) -> (u16, SubmitBidResponse) {
    let result = engine
        .submit(BidRequest {
            auction_id,
            user_id,
            amount,
            deadline: Some(Instant::now() + submit_timeout),
        })
        .await;

    match result {
        Ok(accepted) => (
            200,
            SubmitBidResponse {
                outcome: "accepted",
                reason: None,
                current_bid: accepted.auction.current_bid,
                bid_count: accepted.auction.bid_count,
                version: accepted.auction.version,
            },
        ),
        Err(e) => {
            let status = status_for(Some(&e));
            let (current_bid, bid_count, version) = match store.load(auction_id).await {
                Ok(a) => (a.current_bid, a.bid_count, a.version),
                Err(_) => (None, 0, 0),
            };
            (
                status,
                SubmitBidResponse {
                    outcome: outcome_label(&e),
                    reason: Some(reason_for(&e)),
                    current_bid,
                    bid_count,
                    version,
                },
            )
        }
    }
}
