//! Ticket metadata lookup contract.

use crate::models::TicketDetail;
use async_trait::async_trait;
use thiserror::Error;

/// Why a ticket's metadata could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The tracker answered with a non-success status (not found, auth, ...).
    Status(u16),
    /// The request never produced a response (connect, timeout, ...).
    Transport(String),
    /// The response body was not a usable issue document.
    Decode(String),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Status(code) => write!(f, "HTTP {}", code),
            UnavailableReason::Transport(msg) => write!(f, "transport error: {}", msg),
            UnavailableReason::Decode(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

/// Metadata for a ticket is unavailable. Recoverable: the ticket is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ticket {id} unavailable ({reason})")]
pub struct FetchUnavailable {
    pub id: String,
    pub reason: UnavailableReason,
}

impl FetchUnavailable {
    pub fn new(id: impl Into<String>, reason: UnavailableReason) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }
}

/// Source of authoritative ticket metadata.
///
/// Implementations must map ordinary failures (not found, network, auth)
/// to [`FetchUnavailable`] rather than panicking. Timeouts are the
/// implementation's concern.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Look up a single ticket by identifier.
    async fn fetch_detail(&self, id: &str) -> Result<TicketDetail, FetchUnavailable>;
}
