//! Best-effort client metadata derivation
//!
//! Session id, client IP and user agent are each resolved by walking an
//! ordered list of sources and taking the first one that yields a non-empty
//! value. None of these values are authenticated: headers are client
//! controlled and the peer address is whatever the socket reports.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use baitline_core::{EnrichedFields, ForwardedHeaders};
use rand::Rng;

/// Fallback for values no source could provide
pub const UNKNOWN: &str = "unknown";

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 10;

/// A place a metadata value may be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A request header, skipped when absent, empty or not valid UTF-8
    Header(&'static str),
    /// IP address of the connected peer
    PeerAddr,
    /// A fresh random base-36 token
    RandomToken,
    /// A fixed value
    Literal(&'static str),
}

/// `x-session-id` header, then peer address, then a random token
pub const SESSION_ID_SOURCES: &[Source] = &[
    Source::Header("x-session-id"),
    Source::PeerAddr,
    Source::RandomToken,
];

/// Proxy headers, then peer address
pub const CLIENT_IP_SOURCES: &[Source] = &[
    Source::Header("x-forwarded-for"),
    Source::Header("x-real-ip"),
    Source::PeerAddr,
    Source::Literal(UNKNOWN),
];

pub const USER_AGENT_SOURCES: &[Source] = &[Source::Header("user-agent"), Source::Literal(UNKNOWN)];

/// Random lowercase base-36 token
pub fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Request attributes the lookups read from
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    headers: HeaderMap,
    peer: Option<IpAddr>,
}

impl ClientContext {
    pub fn new(headers: HeaderMap, peer: Option<IpAddr>) -> Self {
        Self { headers, peer }
    }

    /// Raw header value, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Value from a single source
    pub fn lookup(&self, source: Source) -> Option<String> {
        match source {
            Source::Header(name) => self.header(name).filter(|v| !v.is_empty()),
            Source::PeerAddr => self.peer.map(|ip| ip.to_string()),
            Source::RandomToken => Some(random_token()),
            Source::Literal(value) => Some(value.to_string()),
        }
    }

    /// First value produced by `sources`, in order
    pub fn resolve(&self, sources: &[Source]) -> Option<String> {
        sources.iter().find_map(|source| self.lookup(*source))
    }

    fn resolve_or_unknown(&self, sources: &[Source]) -> String {
        self.resolve(sources).unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn session_id(&self) -> String {
        self.resolve_or_unknown(SESSION_ID_SOURCES)
    }

    pub fn client_ip(&self) -> String {
        self.resolve_or_unknown(CLIENT_IP_SOURCES)
    }

    pub fn user_agent(&self) -> String {
        self.resolve_or_unknown(USER_AGENT_SOURCES)
    }

    /// Metadata attached to every stored tracking event
    pub fn enriched_fields(&self) -> EnrichedFields {
        EnrichedFields {
            session_id: self.session_id(),
            ip: self.client_ip(),
            user_agent: self.user_agent(),
        }
    }

    /// The four headers copied onto collected records
    pub fn forwarded_headers(&self) -> ForwardedHeaders {
        ForwardedHeaders {
            user_agent: self.header("user-agent"),
            accept_language: self.header("accept-language"),
            accept_encoding: self.header("accept-encoding"),
            referer: self.header("referer"),
        }
    }
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self::new(parts.headers.clone(), peer))
    }
}
