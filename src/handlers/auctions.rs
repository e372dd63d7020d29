//! `GET`/`POST` handlers over a single auction (spec.md §6).

use axum::{
    extract::{
        Path,
        State,
    },
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::{
    auth::UserId,
    state::AppState,
};
use crate::{
    error::StoreError,
    models::auction::Auction,
    services::ingress,
};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET auction` (spec.md §6) plus a passive `subscriber_count` readout
/// (SPEC_FULL.md §15) derived live from the broadcaster registry, not
/// persisted alongside the auction row.
#[derive(Debug, Serialize)]
pub struct AuctionSnapshot {
    #[serde(flatten)]
    pub auction: Auction,
    pub subscriber_count: usize,
}

pub async fn get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    match state.store.load(auction_id).await {
        Ok(auction) => {
            let subscriber_count = state.broadcaster.subscriber_count(auction_id);
            Json(AuctionSnapshot {
                auction,
                subscriber_count,
            })
            .into_response()
        }
        Err(e) => not_found_or_500(auction_id, e),
    }
}

/// `GET auction bids` (spec.md §6): accepted bid history, descending by
/// amount.
pub async fn get_bid_history(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> Response {
    match state.store.bid_history(auction_id).await {
        Ok(bids) => Json(bids).into_response(),
        Err(e) => {
            tracing::error!(auction_id = %auction_id, error = %e, "failed to load bid history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "failed to load bid history".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `POST submit bid` (spec.md §6). Status codes follow the taxonomy in
/// [`crate::services::ingress::status_for`].
pub async fn submit_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
    UserId(user_id): UserId,
    Json(body): Json<ingress::SubmitBidRequest>,
) -> Response {
    let (status, body) = ingress::submit_bid(
        &state.engine,
        state.store.as_ref(),
        auction_id,
        user_id,
        body.amount,
        state.bid_submit_timeout,
    )
    .await;

    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(body))
        .into_response()
}

fn not_found_or_500(auction_id: Uuid, err: StoreError) -> Response {
    match err {
        StoreError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: format!("auction {auction_id} not found"),
            }),
        )
            .into_response(),
        other => {
            tracing::error!(auction_id = %auction_id, error = %other, "failed to load auction");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "failed to load auction".to_string(),
                }),
            )
                .into_response()
        }
    }
}
