//! Request id allocation and response correlation.
//!
//! Ids start at 1 and grow by one per request; each id maps to the
//! method it was sent with until the matching response arrives.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Value, to_string};
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::RequestId;

use super::message::{Envelope, Incoming, Notification, Response, ServerRequest};
use super::request::{Method, Reply, Request};

// ============================================================================
// Types
// ============================================================================

/// Map of in-flight request ids to their methods.
type PendingMap = FxHashMap<RequestId, Method>;

// ============================================================================
// Correlator
// ============================================================================

/// Session-scoped JSON-RPC bookkeeping.
#[derive(Debug, Clone)]
pub struct Correlator {
    /// Id for the next request.
    next_id: RequestId,
    /// Requests awaiting a response.
    pending: PendingMap,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Creates a correlator whose first id is 1.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: RequestId::FIRST,
            pending: PendingMap::default(),
        }
    }

    /// Serializes a request under the next id and records it as pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `params` fail to serialize;
    /// no id is consumed in that case.
    pub fn request<P: Serialize>(&mut self, method: Method, params: P) -> Result<(RequestId, String)> {
        let id = self.next_id;
        let text = to_string(&Request::new(id, method, params))?;

        self.next_id = id.next();
        self.pending.insert(id, method);
        debug!(%id, %method, "Request queued");

        Ok((id, text))
    }

    /// Serializes a reply to a server-initiated request.
    ///
    /// No correlation bookkeeping is involved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn respond(id: Value, result: Value) -> Result<String> {
        Ok(to_string(&Reply::new(id, result))?)
    }

    /// Parses and classifies one inbound text message.
    ///
    /// A response removes its pending entry; everything else leaves the
    /// table untouched.
    pub fn classify(&mut self, text: &str) -> Incoming {
        let Some(envelope) = Envelope::parse(text) else {
            trace!(len = text.len(), "Dropped unparseable message");
            return Incoming::Ignored;
        };

        if let Some(id) = envelope.request_id()
            && let Some(method) = self.pending.remove(&id)
        {
            trace!(%id, %method, "Response correlated");
            return Incoming::Response(Response::from_envelope(id, method, envelope));
        }

        match (envelope.id, envelope.method) {
            (Some(id), Some(method)) => Incoming::ServerRequest(ServerRequest { id, method }),
            (None, Some(method)) => match Notification::from_parts(method, envelope.params) {
                Some(notification) => Incoming::Notification(notification),
                None => Incoming::Ignored,
            },
            (Some(id), None) => {
                trace!(%id, "Response for unknown request");
                Incoming::Ignored
            }
            (None, None) => Incoming::Ignored,
        }
    }

    /// Forgets all pending requests and restarts ids at 1.
    pub fn reset(&mut self) {
        self.next_id = RequestId::FIRST;
        self.pending.clear();
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns the method a pending id was sent with.
    #[inline]
    #[must_use]
    pub fn pending_method(&self, id: RequestId) -> Option<Method> {
        self.pending.get(&id).copied()
    }
}

// ============================================================================
// Tests
// ============================================================================
