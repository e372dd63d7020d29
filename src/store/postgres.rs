//! PostgreSQL-backed [`AuctionStore`], in the `query_as`-over-`PgPool` style
//! the scheduler of the auction-domain reference crate in this corpus uses
//! (fetch rows, one transaction per mutation, bind with `$n` placeholders).

use async_trait::async_trait;
use chrono::{
    DateTime,
    Utc,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    AuctionStore,
    BidCommit,
};
use crate::{
    error::StoreError,
    models::{
        auction::Auction,
        bid::Bid,
    },
};

pub struct PgAuctionStore {
    pool: PgPool,
}

impl PgAuctionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
        }
    }

    /// Run pending `migrations/` against the configured database. Called
    /// once at process start, before the scheduler and ingress router come
    /// up (SPEC_FULL.md §13).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))
    }
}

#[async_trait]
impl AuctionStore for PgAuctionStore {
    async fn load(&self, auction_id: Uuid) -> Result<Auction, StoreError> {
        sqlx::query_as::<_, Auction>("SELECT * FROM auctions WHERE id = $1")
            .bind(auction_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(auction_id))
    }

    async fn compare_and_set_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        new_amount: Decimal,
        previous_high_bid: Option<Decimal>,
        expected_version: i64,
    ) -> Result<BidCommit, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET current_bid = $1,
                 current_bid_user_id = $2,
                 bid_count = bid_count + 1,
                 version = version + 1,
                 updated_at = now()
             WHERE id = $3 AND version = $4
             RETURNING *",
        )
        .bind(new_amount)
        .bind(user_id)
        .bind(auction_id)
        .bind(expected_version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return Err(StoreError::VersionConflict(auction_id));
        };

        // Flip any other user's standing accepted bid to outbid before
        // inserting the new one, so invariant 1 (exactly one accepted bid
        // matches current_bid) never observes two accepted rows at once.
        sqlx::query(
            "UPDATE bids
             SET status = 'outbid'
             WHERE auction_id = $1 AND status = 'accepted' AND user_id <> $2",
        )
        .bind(auction_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let bid_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO bids (id, auction_id, user_id, amount, status, previous_high_bid, created_at)
             VALUES ($1, $2, $3, $4, 'accepted', $5, now())",
        )
        .bind(bid_id)
        .bind(auction_id)
        .bind(user_id)
        .bind(new_amount)
        .bind(previous_high_bid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BidCommit {
            auction: updated,
            bid_id,
        })
    }

    async fn insert_rejected_bid(
        &self,
        auction_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        previous_high_bid: Option<Decimal>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO bids (id, auction_id, user_id, amount, status, previous_high_bid, created_at)
             VALUES ($1, $2, $3, $4, 'rejected', $5, now())",
        )
        .bind(Uuid::now_v7())
        .bind(auction_id)
        .bind(user_id)
        .bind(amount)
        .bind(previous_high_bid)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn compare_and_set_extension(
        &self,
        auction_id: Uuid,
        expected_version: i64,
        extension_step_secs: i32,
    ) -> Result<Auction, StoreError> {
        let updated = sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET ends_at = ends_at + make_interval(secs => $1),
                 extension_count = extension_count + 1,
                 version = version + 1,
                 updated_at = now()
             WHERE id = $2 AND version = $3 AND extension_count < max_extensions
             RETURNING *",
        )
        .bind(f64::from(extension_step_secs))
        .bind(auction_id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(auction) => Ok(auction),
            None => {
                // Distinguish a stale version from an exhausted budget so the
                // extender can treat them differently (both are benign, but
                // the exhausted case is terminal for this auction).
                let current = self.load(auction_id).await?;
                if current.version != expected_version {
                    Err(StoreError::VersionConflict(auction_id))
                } else {
                    Err(StoreError::ExtensionExhausted(auction_id))
                }
            }
        }
    }

    async fn list_auctions_to_start(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError> {
        sqlx::query_as::<_, Auction>(
            "SELECT * FROM auctions
             WHERE status = 'scheduled' AND starts_at <= $1
             ORDER BY starts_at
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn list_auctions_to_end(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Auction>, StoreError> {
        sqlx::query_as::<_, Auction>(
            "SELECT * FROM auctions
             WHERE status = 'active' AND ends_at <= $1
             ORDER BY ends_at
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn mark_started(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError> {
        sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET status = 'active', updated_at = now()
             WHERE id = $1 AND status = 'scheduled'
             RETURNING *",
        )
        .bind(auction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn mark_ended(&self, auction_id: Uuid) -> Result<Option<Auction>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let ended = sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET status = 'ended',
                 winner_id = current_bid_user_id,
                 winning_bid = current_bid,
                 updated_at = now()
             WHERE id = $1 AND status = 'active'
             RETURNING *",
        )
        .bind(auction_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ended) = ended else {
            tx.rollback().await?;
            return Ok(None);
        };

        let payload = serde_json::json!({
            "auction_id": ended.id,
            "winner_id": ended.winner_id,
            "winning_bid": ended.winning_bid,
        });
        sqlx::query(
            "INSERT INTO outbox (payload, delivered) VALUES ($1, false)",
        )
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(ended))
    }

    async fn bid_history(&self, auction_id: Uuid) -> Result<Vec<Bid>, StoreError> {
        sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids
             WHERE auction_id = $1 AND status = 'accepted'
             ORDER BY amount DESC",
        )
        .bind(auction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn mark_delivered(&self, outbox_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE outbox SET delivered = true, delivered_at = now() WHERE id = $1")
            .bind(outbox_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
