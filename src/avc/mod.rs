/*!
 * Access Vector Cache
 * Caches security server decisions, audits checks and applies policy change notifications
 */

pub mod audit;
pub mod cache;
pub mod classes;
pub mod config;
pub mod entry_ref;
pub mod manager;
pub mod notify;
pub mod types;

pub use audit::{AuditKind, AuditLogger, AuditStats, AvcAuditData, AvcAuditRecord};
pub use cache::{AvcStats, HashStats};
pub use config::AvcConfig;
pub use entry_ref::AvcEntryRef;
pub use manager::AccessVectorCache;
pub use notify::{CallbackFn, CallbackHandle};
pub use types::*;
