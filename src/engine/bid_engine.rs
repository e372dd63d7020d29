//! Bid Engine (spec.md §4.B): pre-validation, the OCC commit loop, and the
//! anti-snipe tail.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{
    debug,
    warn,
};
use uuid::Uuid;

use super::{
    authorizer::BidAuthorizer,
    extender,
    locks::AuctionLocks,
};
use crate::{
    broadcast::EventBroadcaster,
    config::AuctionConfig,
    error::{
        BidError,
        StoreError,
        ValidationReason,
    },
    metrics,
    models::{
        auction::{
            Auction,
            AuctionStatus,
        },
        event::AuctionEvent,
    },
    store::AuctionStore,
};

/// A submission to the Bid Engine. `deadline` is the cancellation token of
/// spec.md §5: if it elapses before commit, `submit` returns `Cancelled`
/// without writing a bid row; it is a no-op once the commit has landed.
#[derive(Debug, Clone)]
pub struct BidRequest {
    pub auction_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct Accepted {
    pub auction: Auction,
    pub bid_id: Uuid,
}

pub struct BidEngine {
    store: Arc<dyn AuctionStore>,
    broadcaster: Arc<EventBroadcaster>,
    authorizer: Arc<dyn BidAuthorizer>,
    config: AuctionConfig,
    locks: AuctionLocks,
}

impl BidEngine {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        broadcaster: Arc<EventBroadcaster>,
        authorizer: Arc<dyn BidAuthorizer>,
        config: AuctionConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            authorizer,
            config,
            locks: AuctionLocks::new(),
        }
    }

    /// Validate, persist, and resolve a bid (spec.md §4.B).
    pub async fn submit(&self, request: BidRequest) -> Result<Accepted, BidError> {
        let lock = self.locks.get(request.auction_id);
        let _guard = lock.lock().await;

        if Self::deadline_elapsed(&request) {
            metrics::record_bid_outcome("cancelled", 0);
            return Err(BidError::Cancelled);
        }

        let mut snapshot = self.load_for_bid(request.auction_id).await?;
        if let Err(e) = self.pre_validate(&snapshot, &request).await {
            metrics::record_bid_outcome("validation", 0);
            return Err(e);
        }

        let mut attempt = 0u32;
        loop {
            if Self::deadline_elapsed(&request) {
                metrics::record_bid_outcome("cancelled", attempt);
                return Err(BidError::Cancelled);
            }
            attempt += 1;
            if attempt > self.config.occ_max_retries {
                warn!(
                    auction_id = %request.auction_id,
                    attempts = attempt,
                    "OCC retry budget exhausted"
                );
                metrics::record_bid_outcome("contention", attempt);
                return Err(BidError::Contention);
            }

            let commit_result = self
                .store
                .compare_and_set_bid(
                    request.auction_id,
                    request.user_id,
                    request.amount,
                    snapshot.current_bid,
                    snapshot.version,
                )
                .await;

            match commit_result {
                Ok(commit) => {
                    debug!(
                        auction_id = %request.auction_id,
                        bid_id = %commit.bid_id,
                        amount = %request.amount,
                        attempt,
                        "bid accepted"
                    );

                    self.broadcaster.publish(
                        request.auction_id,
                        AuctionEvent::BidUpdate {
                            auction_id: request.auction_id,
                            current_bid: request.amount,
                            bid_count: commit.auction.bid_count,
                            bidder_id: request.user_id,
                            timestamp: Utc::now(),
                        },
                    );

                    extender::maybe_extend(
                        self.store.as_ref(),
                        self.broadcaster.as_ref(),
                        &commit.auction,
                    )
                    .await;

                    metrics::record_bid_outcome("accepted", attempt);
                    return Ok(Accepted {
                        auction: commit.auction,
                        bid_id: commit.bid_id,
                    });
                }
                Err(StoreError::VersionConflict(_)) => {
                    snapshot = self.load_for_bid(request.auction_id).await?;
                    if request.amount <= snapshot.floor_bid() {
                        self.store
                            .insert_rejected_bid(
                                request.auction_id,
                                request.user_id,
                                request.amount,
                                snapshot.current_bid,
                            )
                            .await?;
                        metrics::record_bid_outcome("outbid", attempt);
                        return Err(BidError::Outbid);
                    }
                    // A higher bid landed first but ours still clears the new
                    // floor: retry the OCC loop against the refreshed version.
                    continue;
                }
                Err(e) => {
                    let bid_err: BidError = e.into();
                    let label = if matches!(bid_err, BidError::Overloaded) {
                        "overloaded"
                    } else {
                        "internal"
                    };
                    metrics::record_bid_outcome(label, attempt);
                    return Err(bid_err);
                }
            }
        }
    }

    /// Load the auction for a bid attempt, treating a nonexistent/mistyped
    /// `auction_id` as an ordinary client error (`AuctionNotOpen`) rather
    /// than the `Internal` fault the blanket `StoreError` conversion would
    /// otherwise produce — a bid against an unknown auction is a routine
    /// occurrence, not an invariant violation worth alerting on.
    async fn load_for_bid(&self, auction_id: Uuid) -> Result<Auction, BidError> {
        match self.store.load(auction_id).await {
            Ok(auction) => Ok(auction),
            Err(StoreError::NotFound(_)) => {
                Err(BidError::Validation(ValidationReason::AuctionNotOpen))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pre_validate(&self, auction: &Auction, request: &BidRequest) -> Result<(), BidError> {
        if auction.status != AuctionStatus::Active {
            return Err(BidError::Validation(ValidationReason::AuctionNotOpen));
        }
        if Utc::now() >= auction.ends_at {
            return Err(BidError::Validation(ValidationReason::AuctionClosed));
        }
        if request.user_id == auction.seller_id {
            return Err(BidError::Validation(ValidationReason::SelfBid));
        }
        if !self
            .authorizer
            .can_bid(request.auction_id, request.user_id)
            .await
        {
            return Err(BidError::Validation(ValidationReason::Unauthorized));
        }
        if request.amount <= Decimal::ZERO || request.amount.round_dp(2) != request.amount {
            return Err(BidError::Validation(ValidationReason::MalformedAmount));
        }
        if request.amount < auction.floor_bid() + self.config.min_bid_increment {
            return Err(BidError::Validation(ValidationReason::TooLow));
        }
        if request.amount > self.config.max_bid_amount {
            return Err(BidError::Validation(ValidationReason::TooHigh));
        }
        Ok(())
    }

    fn deadline_elapsed(request: &BidRequest) -> bool {
        request
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::store::InMemoryAuctionStore;

    fn make_auction(seller_id: Uuid) -> Auction {
        let now = Utc::now();
        Auction {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            seller_id,
            status: AuctionStatus::Active,
            starts_at: now - Duration::minutes(10),
            ends_at: now + Duration::minutes(10),
            starting_price: dec!(22000),
            current_bid: None,
            current_bid_user_id: None,
            bid_count: 0,
            version: 0,
            extension_count: 0,
            max_extensions: 10,
            snipe_threshold_secs: 120,
            extension_step_secs: 120,
            winner_id: None,
            winning_bid: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_engine(store: Arc<InMemoryAuctionStore>) -> BidEngine {
        BidEngine::new(
            store,
            Arc::new(EventBroadcaster::new(32)),
            Arc::new(super::super::authorizer::AlwaysAuthorized),
            AuctionConfig::default(),
        )
    }

    #[tokio::test]
    async fn s1_simple_accept() {
        let seller = Uuid::new_v4();
        let auction = make_auction(seller);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store.clone());

        let bidder = Uuid::new_v4();
        let accepted = engine
            .submit(BidRequest {
                auction_id,
                user_id: bidder,
                amount: dec!(22500),
                deadline: None,
            })
            .await
            .expect("bid should be accepted");

        assert_eq!(accepted.auction.current_bid, Some(dec!(22500)));
        assert_eq!(accepted.auction.bid_count, 1);
        assert_eq!(accepted.auction.version, 1);
    }

    #[tokio::test]
    async fn s3_self_bid_rejected() {
        let seller = Uuid::new_v4();
        let auction = make_auction(seller);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store.clone());

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: seller,
                amount: dec!(25000),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::SelfBid))
        ));
        let unchanged = store.snapshot(auction_id).unwrap();
        assert_eq!(unchanged.bid_count, 0);
        assert_eq!(unchanged.current_bid, None);
    }

    #[tokio::test]
    async fn rejects_amount_below_minimum_increment() {
        let seller = Uuid::new_v4();
        let mut auction = make_auction(seller);
        auction.current_bid = Some(dec!(22500));
        auction.current_bid_user_id = Some(Uuid::new_v4());
        auction.bid_count = 1;
        auction.version = 1;
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store);

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(22500.50),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::TooLow))
        ));
    }

    #[tokio::test]
    async fn rejects_malformed_amount_precision() {
        let seller = Uuid::new_v4();
        let auction = make_auction(seller);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store);

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(22500.123),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::MalformedAmount))
        ));
    }

    #[tokio::test]
    async fn s4_anti_snipe_extends_deadline() {
        let seller = Uuid::new_v4();
        let mut auction = make_auction(seller);
        auction.ends_at = Utc::now() + Duration::seconds(30);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction.clone());
        let engine = make_engine(store.clone());

        let accepted = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(22500),
                deadline: None,
            })
            .await
            .expect("bid should be accepted");

        // maybe_extend runs synchronously as the tail of submit, so by the
        // time submit returns the extension (if any) has already landed.
        let after = store.snapshot(auction_id).unwrap();
        assert!(after.ends_at > auction.ends_at);
        assert_eq!(after.extension_count, 1);
        assert!(accepted.auction.ends_at <= after.ends_at);
    }

    #[tokio::test]
    async fn s5_extension_cap_prevents_further_extension() {
        let seller = Uuid::new_v4();
        let mut auction = make_auction(seller);
        auction.ends_at = Utc::now() + Duration::seconds(30);
        auction.extension_count = auction.max_extensions;
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction.clone());
        let engine = make_engine(store.clone());

        engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(22500),
                deadline: None,
            })
            .await
            .expect("bid should be accepted");

        let after = store.snapshot(auction_id).unwrap();
        assert_eq!(after.ends_at, auction.ends_at);
        assert_eq!(after.extension_count, auction.max_extensions);
    }

    #[tokio::test]
    async fn bid_against_an_ended_auction_is_rejected() {
        let seller = Uuid::new_v4();
        let mut auction = make_auction(seller);
        auction.status = AuctionStatus::Ended;
        auction.ends_at = Utc::now() - Duration::minutes(5);
        auction.winner_id = Some(Uuid::new_v4());
        auction.winning_bid = Some(dec!(24000));
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store.clone());

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(30000),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::AuctionNotOpen))
        ));
        let unchanged = store.snapshot(auction_id).unwrap();
        assert_eq!(unchanged.bid_count, 0);
        assert_eq!(unchanged.version, 0);
    }

    #[tokio::test]
    async fn bid_past_the_deadline_on_a_still_active_row_is_rejected() {
        // The scheduler hasn't ticked yet, so status is still `Active`, but
        // `ends_at` has already passed: pre-validation must catch this on
        // its own rather than relying on the lifecycle scheduler's timing.
        let seller = Uuid::new_v4();
        let mut auction = make_auction(seller);
        auction.ends_at = Utc::now() - Duration::seconds(1);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store.clone());

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(25000),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::AuctionClosed))
        ));
    }

    #[tokio::test]
    async fn bid_against_an_unknown_auction_id_is_a_validation_rejection() {
        // A mistyped or stale auction_id is a routine client error, not an
        // internal fault — must not surface as `BidError::Internal`/500.
        let store = Arc::new(InMemoryAuctionStore::new());
        let engine = make_engine(store);

        let result = engine
            .submit(BidRequest {
                auction_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                amount: dec!(22500),
                deadline: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(BidError::Validation(ValidationReason::AuctionNotOpen))
        ));
    }

    #[tokio::test]
    async fn cancelled_submission_before_commit_writes_no_bid() {
        let seller = Uuid::new_v4();
        let auction = make_auction(seller);
        let auction_id = auction.id;
        let store = Arc::new(InMemoryAuctionStore::new());
        store.insert(auction);
        let engine = make_engine(store.clone());

        let result = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount: dec!(22500),
                deadline: Some(Instant::now()),
            })
            .await;

        assert!(matches!(result, Err(BidError::Cancelled)));
        assert_eq!(store.snapshot(auction_id).unwrap().bid_count, 0);
    }
}
