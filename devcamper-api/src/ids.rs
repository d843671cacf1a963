//! Request identifiers
//!
//! Every request gets a TypeID such as `req_01h455vb4pex5vsknk084sn02q`: a `req`
//! prefix over a UUIDv7, so ids sort by arrival time in the logs.

use std::fmt;

use http::{HeaderValue, Request};
use mti::prelude::*;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};

/// Time-sortable request identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(MagicTypeId);

impl RequestId {
    /// Prefix of every request id
    pub const PREFIX: &'static str = "req";

    /// Generate a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self(Self::PREFIX.create_type_id::<V7>())
    }

    /// The id as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `MakeRequestId` that stamps requests lacking an id with a [`RequestId`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let header_value = HeaderValue::from_str(RequestId::new().as_str()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}
