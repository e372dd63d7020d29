//! Per-auction serialization (spec.md §4.B: "bids for the same auction are
//! serialized by an auction-keyed lock... so the OCC loop does not spin
//! against itself"). Purely an in-process optimization: correctness rests
//! on the database version check, not on this lock (spec.md §9).

use std::{
    collections::HashMap,
    sync::Arc,
};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

#[derive(Default)]
pub struct AuctionLocks {
    locks: SyncMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl AuctionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, auction_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(auction_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
