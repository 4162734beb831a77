/*!
 * AVC Audit Trail
 * Keeps recently emitted AVC records and per-source denial counters
 */

mod record;

pub use record::{select_audited, AuditKind, AuditSelection, AvcAuditData, AvcAuditRecord};

use crate::core::types::Sid;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Audit logger for AVC records
pub struct AuditLogger {
    /// Recent records (ring buffer)
    events: RwLock<VecDeque<AvcAuditRecord>>,
    capacity: usize,
    /// Denials per source SID
    denial_counts: DashMap<Sid, u64, RandomState>,
    total_logged: AtomicU64,
}

impl AuditLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            denial_counts: DashMap::with_hasher(RandomState::new()),
            total_logged: AtomicU64::new(0),
        }
    }

    /// Emit a record on the `avc` target and retain it
    pub fn log(&self, record: AvcAuditRecord) {
        if record.denied {
            warn!(target: "avc", ssid = record.ssid, tsid = record.tsid, "{}", record);
            self.denial_counts
                .entry(record.ssid)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        } else {
            info!(target: "avc", ssid = record.ssid, tsid = record.tsid, "{}", record);
        }
        self.total_logged.fetch_add(1, Ordering::Relaxed);

        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.write();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(record);
    }

    /// Most recent records, newest first
    pub fn recent(&self, limit: usize) -> Vec<AvcAuditRecord> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Denials recorded for a source SID
    pub fn denial_count(&self, ssid: Sid) -> u64 {
        self.denial_counts.get(&ssid).map(|e| *e).unwrap_or(0)
    }

    /// Source SIDs with at least one denial
    pub fn sids_with_denials(&self) -> Vec<(Sid, u64)> {
        self.denial_counts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    pub fn clear_all(&self) {
        self.events.write().clear();
        self.denial_counts.clear();
        self.total_logged.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            total_logged: self.total_logged.load(Ordering::Relaxed),
            retained: self.events.read().len(),
            total_denials: self.denial_counts.iter().map(|e| *e.value()).sum(),
            sids_tracked: self.denial_counts.len(),
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(crate::core::limits::MAX_AUDIT_EVENTS)
    }
}

/// Audit statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_logged: u64,
    pub retained: usize,
    pub total_denials: u64,
    pub sids_tracked: usize,
}
