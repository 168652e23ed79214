//! Actor context middleware.
//!
//! Extracts the acting user and branch from request headers. These headers
//! are set by the gateway after authenticating the user; authentication
//! itself is outside this service.

use axum::async_trait;
use axum::extract::{FromRequestParts, MatchedPath, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::services::metrics::HTTP_REQUESTS_TOTAL;

/// Actor context extracted from request headers.
///
/// Both fields are optional: settlements recorded by background jobs carry
/// neither, and branch scoping only applies to the cash-book entry.
#[derive(Debug, Clone, Default)]
pub struct ActorContext {
    pub actor_id: Option<String>,
    pub branch_id: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = parts
            .headers
            .get("X-Actor-ID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let branch_id = parts
            .headers
            .get("X-Branch-ID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ref actor) = actor_id {
            tracing::Span::current().record("actor_id", actor.as_str());
        }

        Ok(ActorContext {
            actor_id,
            branch_id,
        })
    }
}

/// Count every HTTP request by route template and response status.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&route, response.status().as_str()])
        .inc();

    response
}
