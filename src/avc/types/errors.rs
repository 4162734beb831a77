/*!
 * AVC Errors
 * Error taxonomy for permission checks, cache maintenance and policy notifications
 */

use super::core::AvcEvent;
use crate::core::types::{AccessVector, SecurityClass, SeqNo, Sid};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for cache operations
pub type AvcResult<T> = Result<T, AvcError>;

/// Result type returned by notification callbacks (retained permissions on success)
pub type CallbackResult<T> = Result<T, CallbackError>;

pub const EACCES: i32 = 13;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const EIO: i32 = 5;

/// Errors reported by the security server
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SecurityServerError {
    #[error("Unknown security identifier {0}")]
    #[diagnostic(
        code(security_server::unknown_sid),
        help("The SID is not mapped by the loaded policy.")
    )]
    UnknownSid(Sid),

    #[error("Unknown security class {0}")]
    #[diagnostic(code(security_server::unknown_class))]
    UnknownClass(SecurityClass),

    #[error("Policy not loaded")]
    #[diagnostic(
        code(security_server::not_loaded),
        help("Load a policy before computing access decisions.")
    )]
    NotLoaded,

    #[error("Security server failure: {0}")]
    #[diagnostic(code(security_server::internal))]
    Internal(String),
}

impl SecurityServerError {
    pub fn errno(&self) -> i32 {
        match self {
            SecurityServerError::UnknownSid(_) | SecurityServerError::UnknownClass(_) => EINVAL,
            SecurityServerError::NotLoaded | SecurityServerError::Internal(_) => EIO,
        }
    }
}

/// Failure reported by a notification callback
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("{reason}")]
pub struct CallbackError {
    pub reason: String,
}

impl CallbackError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Access vector cache errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum AvcError {
    #[error("Permission denied: ssid={ssid} tsid={tsid} tclass={tclass} denied={denied:#x}")]
    #[diagnostic(
        code(avc::denied),
        help("Policy does not grant the requested permissions in enforcing mode.")
    )]
    Denied {
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        denied: AccessVector,
    },

    #[error("Stale decision: seqno {seqno} < latest notification {latest}")]
    #[diagnostic(
        code(avc::stale_sequence),
        help("Policy changed while the decision was computed. Recompute and retry.")
    )]
    StaleSequence { seqno: SeqNo, latest: SeqNo },

    #[error("Cache capacity exhausted ({max_nodes} nodes)")]
    #[diagnostic(
        code(avc::capacity_exhausted),
        help("No reclaimable node was found after two clock passes.")
    )]
    CapacityExhausted { max_nodes: usize },

    #[error("Gave up after {attempts} stale insert attempts")]
    #[diagnostic(
        code(avc::retries_exhausted),
        help("Policy is being reloaded continuously. Retry the operation later.")
    )]
    RetriesExhausted { attempts: u32 },

    #[error("Security server error: {0}")]
    #[diagnostic(transparent)]
    SecurityServer(#[from] SecurityServerError),

    #[error("Callback failed during {event}: {reason}")]
    #[diagnostic(
        code(avc::callback_failed),
        help("Cache bitmask edits already applied are kept; the caller decides whether to retry.")
    )]
    Callback { event: AvcEvent, reason: String },

    #[error("Invalid configuration: {reason}")]
    #[diagnostic(code(avc::invalid_config))]
    InvalidConfig { reason: String },
}

impl AvcError {
    /// errno equivalent surfaced to callers outside the cache
    pub fn errno(&self) -> i32 {
        match self {
            AvcError::Denied { .. } => EACCES,
            AvcError::StaleSequence { .. } | AvcError::RetriesExhausted { .. } => EAGAIN,
            AvcError::CapacityExhausted { .. } => ENOMEM,
            AvcError::SecurityServer(err) => err.errno(),
            AvcError::Callback { .. } => EIO,
            AvcError::InvalidConfig { .. } => EINVAL,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AvcError::Denied { .. })
    }

    pub(crate) fn callback(event: AvcEvent, err: CallbackError) -> Self {
        AvcError::Callback {
            event,
            reason: err.reason,
        }
    }
}
