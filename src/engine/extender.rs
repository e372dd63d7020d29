//! Anti-Snipe Extender (spec.md §4.D). Runs synchronously as the tail of
//! the Bid Engine's commit path, not as a separate task.

use chrono::Utc;
use tracing::{
    debug,
    error,
};

use crate::{
    broadcast::EventBroadcaster,
    error::StoreError,
    metrics,
    models::{
        auction::Auction,
        event::AuctionEvent,
    },
    store::AuctionStore,
};

/// Attempt a single extension against the just-committed bid's post-commit
/// version. `VersionConflict` (another bid already extended) and
/// `ExtensionExhausted` are both benign no-ops from the bid path's point of
/// view; only unexpected store faults are logged as errors.
pub async fn maybe_extend(
    store: &dyn AuctionStore,
    broadcaster: &EventBroadcaster,
    auction: &Auction,
) {
    let now = Utc::now();
    if !auction.within_snipe_window(now) {
        return;
    }

    match store
        .compare_and_set_extension(auction.id, auction.version, auction.extension_step_secs)
        .await
    {
        Ok(extended) => {
            debug!(
                auction_id = %auction.id,
                new_ends_at = %extended.ends_at,
                extension_count = extended.extension_count,
                "anti-snipe extension applied"
            );
            metrics::record_extension(true);
            broadcaster.publish(
                auction.id,
                AuctionEvent::AuctionExtended {
                    auction_id: auction.id,
                    ends_at: extended.ends_at,
                    extension_count: extended.extension_count,
                },
            );
        }
        Err(StoreError::VersionConflict(_)) => {
            debug!(auction_id = %auction.id, "skipping extension, already extended by a concurrent bid");
            metrics::record_extension(false);
        }
        Err(StoreError::ExtensionExhausted(_)) => {
            debug!(auction_id = %auction.id, "extension budget exhausted, auction will close on schedule");
            metrics::record_extension(false);
        }
        Err(e) => {
            error!(auction_id = %auction.id, error = %e, "anti-snipe extension failed unexpectedly");
        }
    }
}
