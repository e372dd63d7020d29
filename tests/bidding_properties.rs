//! Property tests for the invariants of spec.md §8: monotonic winning bid,
//! conservation of `bid_count`, and version monotonicity, driven by
//! `proptest` over sequences of strictly increasing bid amounts against a
//! single in-memory auction.

use std::sync::Arc;

use auction_core::{
    config::AuctionConfig,
    engine::{
        AlwaysAuthorized,
        BidEngine,
        BidRequest,
    },
    models::auction::{
        Auction,
        AuctionStatus,
    },
    store::InMemoryAuctionStore,
    AuctionStore,
};
use chrono::{
    Duration,
    Utc,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn fresh_auction() -> Auction {
    let now = Utc::now();
    Auction {
        id: Uuid::new_v4(),
        vehicle_id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        status: AuctionStatus::Active,
        starts_at: now - Duration::hours(1),
        ends_at: now + Duration::hours(1),
        starting_price: Decimal::new(1000, 0),
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

/// A strictly increasing sequence of bid increments, each in `[1, 5000]`,
/// applied cumulatively on top of the starting price.
fn increasing_increments() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(1i64..=5000, 1..20)
}

proptest! {
    #[test]
    fn winning_bid_and_version_only_increase(increments in increasing_increments()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let auction = fresh_auction();
            let auction_id = auction.id;
            let store = Arc::new(InMemoryAuctionStore::new());
            store.insert(auction.clone());
            let engine = BidEngine::new(
                store.clone(),
                Arc::new(auction_core::broadcast::EventBroadcaster::new(32)),
                Arc::new(AlwaysAuthorized),
                AuctionConfig::default(),
            );

            let mut running_amount = auction.starting_price;
            let mut last_version = 0i64;
            let mut accepted = 0i32;

            for step in increments {
                running_amount += Decimal::new(step, 0);
                let result = engine
                    .submit(BidRequest {
                        auction_id,
                        user_id: Uuid::new_v4(),
                        amount: running_amount,
                        deadline: None,
                    })
                    .await;

                let Ok(accepted_bid) = result else {
                    continue;
                };
                accepted += 1;

                // Property 1: the winning bid only ever increases.
                prop_assert!(accepted_bid.auction.current_bid.unwrap() >= running_amount);
                // Property 4: version observed by any reader never decreases,
                // and increases by exactly 1 per accepted bid here (no
                // extensions triggered: auction has an hour of runway).
                prop_assert_eq!(accepted_bid.auction.version, last_version + 1);
                last_version = accepted_bid.auction.version;
            }

            let final_state = store.snapshot(auction_id).unwrap();
            let history = store.bid_history(auction_id).await.unwrap();

            // Property 2: conservation. bid_count equals the number of
            // accepted bid rows.
            prop_assert_eq!(final_state.bid_count, accepted);
            prop_assert_eq!(history.len() as i32, accepted);
            prop_assert_eq!(final_state.version, last_version);
        });
    }
}

#[tokio::test]
async fn extension_count_never_exceeds_max_extensions() {
    let mut auction = fresh_auction();
    auction.ends_at = Utc::now() + Duration::seconds(10);
    auction.max_extensions = 3;
    let auction_id = auction.id;
    let store = Arc::new(InMemoryAuctionStore::new());
    store.insert(auction);

    let engine = BidEngine::new(
        store.clone(),
        Arc::new(auction_core::broadcast::EventBroadcaster::new(32)),
        Arc::new(AlwaysAuthorized),
        AuctionConfig::default(),
    );

    let mut amount = Decimal::new(2000, 0);
    for _ in 0..10 {
        amount += Decimal::new(500, 0);
        let _ = engine
            .submit(BidRequest {
                auction_id,
                user_id: Uuid::new_v4(),
                amount,
                deadline: None,
            })
            .await;
    }

    let final_state = store.snapshot(auction_id).unwrap();
    assert!(final_state.extension_count <= final_state.max_extensions);
    assert_eq!(final_state.extension_count, 3);
}
