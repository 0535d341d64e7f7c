use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use jiff::Timestamp;
use peephole_core::{Visit, UNKNOWN_USER_AGENT};

/// Request metadata recorded with every event.
///
/// The source address comes from the connection, so it is only present when
/// the router is served with `into_make_service_with_connect_info`.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip_address: Option<String>,
}

impl ClientInfo {
    pub fn into_visit(self, seen_at: Timestamp) -> Visit {
        Visit {
            seen_at,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
        }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_USER_AGENT)
            .to_string();

        let ip_address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self {
            user_agent,
            ip_address,
        })
    }
}
