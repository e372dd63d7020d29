//! Caller identity extraction. Verified-identity and payment-method status
//! live with the external "can bid" predicate (spec.md §1, §4.B step 4);
//! this extractor only recovers *which* user is making the call from the
//! `x-user-id` header a front door (API gateway, session middleware) is
//! expected to set after authenticating the request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        request::Parts,
        StatusCode,
    },
};
use uuid::Uuid;

pub struct UserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .ok_or((StatusCode::UNAUTHORIZED, "missing x-user-id header"))?;
        let raw = raw
            .to_str()
            .map_err(|_| (StatusCode::BAD_REQUEST, "x-user-id header is not valid UTF-8"))?;
        let id = Uuid::parse_str(raw).map_err(|_| (StatusCode::BAD_REQUEST, "x-user-id is not a uuid"))?;
        Ok(UserId(id))
    }
}
