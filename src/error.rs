//! Error types for blocklist-merger.
//!
//! Command-level code reports failures through `anyhow`; the typed errors
//! here describe why a single upstream DNS query produced no answer.

use std::net::SocketAddr;
use std::time::Duration;

use hickory_proto::op::ResponseCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid domain name '{domain}': {reason}")]
    InvalidName { domain: String, reason: String },

    #[error("query to {upstream} timed out after {timeout:?}")]
    Timeout {
        upstream: SocketAddr,
        timeout: Duration,
    },

    #[error("network error talking to {upstream}: {source}")]
    Io {
        upstream: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed DNS message: {0}")]
    Protocol(#[from] hickory_proto::error::ProtoError),

    #[error("response from {upstream} does not match the query")]
    Mismatch { upstream: SocketAddr },

    #[error("{upstream} answered {code}")]
    Rejected {
        upstream: SocketAddr,
        code: ResponseCode,
    },
}

impl ResolveError {
    pub fn io(upstream: SocketAddr, source: std::io::Error) -> Self {
        Self::Io { upstream, source }
    }

    /// NXDOMAIN means the upstream answered authoritatively with nothing.
    pub fn is_negative_answer(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                code: ResponseCode::NXDomain,
                ..
            }
        )
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
