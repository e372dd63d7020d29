//! The "can bid" predicate (spec.md §4.B, pre-validation step 4) is an
//! external collaborator — user verification and payment-method status
//! live outside this core (spec.md §1). Modeled the way the teacher models
//! its other out-of-process integrations, as a `Send + Sync` trait object
//! (see `payments::gateway::PaymentGateway` in the example e-commerce
//! plugin this crate was grown from).

use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait BidAuthorizer: Send + Sync {
    /// Whether `user_id` is currently allowed to bid (verified identity and
    /// a usable payment method, per spec.md §4.B step 4).
    async fn can_bid(&self, auction_id: Uuid, user_id: Uuid) -> bool;
}

/// Permits every bidder. This is the stand-in this crate ships with for the
/// external verified-identity + payment-method service spec.md §1 scopes out
/// as a collaborator — there is no real identity check behind it yet, in
/// tests or in `main.rs`. Replace with a `BidAuthorizer` backed by that
/// service before accepting real bids.
pub struct AlwaysAuthorized;

#[async_trait]
impl BidAuthorizer for AlwaysAuthorized {
    async fn can_bid(&self, _auction_id: Uuid, _user_id: Uuid) -> bool {
        true
    }
}
