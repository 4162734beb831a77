/*!
 * Security AVC Library
 * Access vector cache for a security server, exposed as a library
 */

pub mod avc;
pub mod core;
pub mod monitoring;

// Re-exports
pub use avc::{
    AccessVectorCache, AccessVectorDecision, AvcAuditData, AvcConfig, AvcEntryRef, AvcError,
    AvcEvent, AvcResult, AvcStats, CallbackError, CallbackHandle, EventMask, SecurityServer,
    SecurityServerError,
};
pub use crate::core::types::{AccessVector, SecurityClass, SeqNo, Sid, SECSID_NULL, SECSID_WILD};
pub use monitoring::init_tracing;
