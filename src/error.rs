//! Crate-wide error taxonomy (spec.md §7).
//!
//! Store- and config-level faults wrap lower-level errors with `thiserror`;
//! the higher-level engine and ingress error kinds follow the teacher's
//! convention of a plain enum with a hand-written `Display` impl (see
//! `GatewayError` / `CartError` in the example e-commerce plugin this crate
//! was grown from), since they carry no wrapped source error worth
//! `#[from]`-deriving.

use uuid::Uuid;

/// Faults surfaced by the [`crate::store`] layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("auction {0} not found")]
    NotFound(Uuid),
    #[error("version conflict on auction {0}")]
    VersionConflict(Uuid),
    #[error("extension budget exhausted for auction {0}")]
    ExtensionExhausted(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Faults surfaced by [`crate::config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Validation reasons a submission can be rejected for (spec.md §4.B
/// pre-validation, steps 1-7). Terminal at the Bid Engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    AuctionNotOpen,
    AuctionClosed,
    SelfBid,
    Unauthorized,
    MalformedAmount,
    TooLow,
    TooHigh,
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuctionNotOpen => write!(f, "auction is not open for bidding"),
            Self::AuctionClosed => write!(f, "auction has closed"),
            Self::SelfBid => write!(f, "seller cannot bid on their own auction"),
            Self::Unauthorized => write!(f, "bidder is not authorized to bid"),
            Self::MalformedAmount => write!(f, "bid amount is malformed"),
            Self::TooLow => write!(f, "bid amount is below the required minimum"),
            Self::TooHigh => write!(f, "bid amount exceeds the protective cap"),
        }
    }
}

/// Outcome of [`crate::engine::BidEngine::submit`] (spec.md §4.B / §7).
#[derive(Debug, Clone)]
pub enum BidError {
    /// Non-retryable: caller's request was invalid or unauthorized.
    Validation(ValidationReason),
    /// A legitimate race: a higher bid committed first. Persisted as a
    /// rejected bid row and surfaced so the caller can re-bid.
    Outbid,
    /// OCC retry budget exhausted. Retryable.
    Contention,
    /// Store or connection pool saturated. Retryable with backoff.
    Overloaded,
    /// The submission's deadline elapsed before commit; no bid row written.
    Cancelled,
    /// Unexpected fault. Logged with trace/request ids at the point it is
    /// constructed; returned as an opaque failure across the ingress
    /// boundary.
    Internal(String),
}

impl std::fmt::Display for BidError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(reason) => write!(f, "{reason}"),
            Self::Outbid => write!(f, "a higher bid was already accepted"),
            Self::Contention => write!(f, "too much contention on this auction, please retry"),
            Self::Overloaded => write!(f, "the bidding store is overloaded, please retry"),
            Self::Cancelled => write!(f, "submission was cancelled before it committed"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for BidError {}

impl From<StoreError> for BidError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                Self::Internal(format!("auction {id} disappeared mid-transaction"))
            }
            StoreError::VersionConflict(_) => Self::Contention,
            StoreError::ExtensionExhausted(_) => {
                Self::Internal("extension exhausted surfaced to bid path".to_string())
            }
            StoreError::Database(sqlx::Error::PoolTimedOut) => Self::Overloaded,
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}
