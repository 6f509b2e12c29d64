//! Identity of the caller for audit purposes, carried in the `X-Actor-Id`
//! header by the frontend. Absent or malformed values degrade to anonymous
//! rather than failing the request.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Clone, Copy, Default)]
pub struct ActorId(pub Option<Uuid>);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok());
        Ok(ActorId(actor))
    }
}
