/*!
 * Access Vector Cache
 * Central cache of security server decisions consulted by every permission check
 */

use super::audit::{select_audited, AuditLogger, AvcAuditData, AvcAuditRecord};
use super::cache::{AvcKey, AvcStats, AtomicAvcStats, CacheTable, HashStats, NodeHandle};
use super::config::AvcConfig;
use super::entry_ref::AvcEntryRef;
use super::notify::{apply_event, CallbackRegistry};
use super::types::{AccessVectorDecision, AvcError, AvcEvent, AvcResult, SecurityServer};
use crate::core::types::{AccessVector, SecurityClass, SeqNo, Sid};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Access vector cache
///
/// Cheap to clone; clones share the same table, statistics and callbacks.
#[derive(Clone)]
pub struct AccessVectorCache {
    config: AvcConfig,
    pub(super) table: Arc<Mutex<CacheTable>>,
    pub(super) stats: Arc<AtomicAvcStats>,
    enforcing: Arc<AtomicBool>,
    server: Arc<dyn SecurityServer>,
    pub(super) callbacks: Arc<CallbackRegistry>,
    audit: Arc<AuditLogger>,
    /// Last time capacity exhaustion was reported
    capacity_warned: Arc<Mutex<Option<Instant>>>,
}

/// Decision a check was made against, and the check's outcome
struct Checked {
    avd: AccessVectorDecision,
    outcome: AvcResult<AccessVectorDecision>,
}

/// Where a decision came from
enum Fetched {
    /// Cached, at this node
    Stored(AccessVectorDecision, NodeHandle),
    /// Computed but not cached
    Unstored(AccessVectorDecision, AvcError),
}

fn remember(aeref: &mut Option<&mut AvcEntryRef>, handle: NodeHandle, key: AvcKey) {
    if let Some(aeref) = aeref.as_deref_mut() {
        aeref.set(handle, key);
    }
}

impl AccessVectorCache {
    /// Create a cache with the default geometry
    pub fn new(server: Arc<dyn SecurityServer>) -> Self {
        let config = AvcConfig::default();
        Self::build(config, server)
    }

    /// Create a cache with custom configuration
    pub fn with_config(config: AvcConfig, server: Arc<dyn SecurityServer>) -> AvcResult<Self> {
        config.validate()?;
        Ok(Self::build(config, server))
    }

    fn build(config: AvcConfig, server: Arc<dyn SecurityServer>) -> Self {
        info!(
            slots = config.cache_slots,
            max_nodes = config.max_nodes,
            enforcing = config.enforcing,
            "AVC initialized"
        );
        Self {
            table: Arc::new(Mutex::new(CacheTable::new(
                config.cache_slots,
                config.max_nodes,
            ))),
            stats: Arc::new(AtomicAvcStats::new()),
            enforcing: Arc::new(AtomicBool::new(config.enforcing)),
            server,
            callbacks: Arc::new(CallbackRegistry::new()),
            audit: Arc::new(AuditLogger::new(config.audit_history)),
            capacity_warned: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn config(&self) -> &AvcConfig {
        &self.config
    }

    pub fn set_enforcing(&self, enforcing: bool) {
        let previous = self.enforcing.swap(enforcing, Ordering::SeqCst);
        if previous != enforcing {
            info!(enforcing, "AVC enforcement mode changed");
        }
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforcing.load(Ordering::SeqCst)
    }

    /// Cached decision covering every requested bit, if any
    pub fn lookup(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        requested: AccessVector,
    ) -> Option<AccessVectorDecision> {
        let mut table = self.table.lock();
        self.lookup_locked(&mut table, AvcKey::new(ssid, tsid, tclass), requested)
            .map(|(avd, _)| avd)
    }

    /// Store a computed decision
    ///
    /// Fails with `StaleSequence` when a policy change newer than the
    /// decision has already been seen.
    pub fn insert(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        avd: AccessVectorDecision,
    ) -> AvcResult<()> {
        let result = self
            .table
            .lock()
            .insert(AvcKey::new(ssid, tsid, tclass), avd);
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if matches!(err, AvcError::CapacityExhausted { .. }) {
                    self.warn_capacity();
                }
                Err(err)
            }
        }
    }

    /// Check permissions without auditing
    ///
    /// Returns the decision the check passed against. In permissive mode the
    /// cached entry is widened to include `requested` and the widened decision
    /// is returned.
    pub fn has_perm_noaudit(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        requested: AccessVector,
        aeref: Option<&mut AvcEntryRef>,
    ) -> AvcResult<AccessVectorDecision> {
        self.check(AvcKey::new(ssid, tsid, tclass), requested, aeref)?
            .outcome
    }

    /// Check permissions and audit the outcome
    ///
    /// Security server failures propagate without an audit record. A decision
    /// that could not be cached is audited as a failure.
    pub fn has_perm(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        requested: AccessVector,
        aeref: Option<&mut AvcEntryRef>,
        data: Option<&AvcAuditData>,
    ) -> AvcResult<AccessVectorDecision> {
        let checked = self.check(AvcKey::new(ssid, tsid, tclass), requested, aeref)?;
        self.audit(
            ssid,
            tsid,
            tclass,
            requested,
            &checked.avd,
            checked.outcome.is_err(),
            data,
        );
        checked.outcome
    }

    /// Emit an audit record if the decision asks for one
    #[allow(clippy::too_many_arguments)]
    pub fn audit(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        requested: AccessVector,
        avd: &AccessVectorDecision,
        failed: bool,
        data: Option<&AvcAuditData>,
    ) -> Option<AvcAuditRecord> {
        let selection = select_audited(requested, avd, failed)?;
        let record = AvcAuditRecord::new(
            ssid,
            tsid,
            tclass,
            selection,
            data,
            self.server.sid_to_context(ssid).ok(),
            self.server.sid_to_context(tsid).ok(),
        );
        self.audit.log(record.clone());
        Some(record)
    }

    pub fn stats(&self) -> AvcStats {
        self.stats.snapshot()
    }

    /// Chain occupancy, logged at info level
    pub fn hash_eval(&self) -> HashStats {
        let stats = self.table.lock().hash_eval();
        info!(
            "avc:  {} entries and {}/{} buckets used, longest chain length {}",
            stats.entries, stats.slots_used, stats.slots_total, stats.longest_chain
        );
        stats
    }

    pub fn active_nodes(&self) -> u32 {
        self.table.lock().active_nodes()
    }

    pub fn latest_notif(&self) -> SeqNo {
        self.table.lock().latest_notif()
    }

    pub fn audit_log(&self) -> &AuditLogger {
        &self.audit
    }

    /// Drop every registration and cached decision
    pub fn shutdown(&self) {
        self.callbacks.clear();
        self.table.lock().flush();
        self.stats.reset();
        self.audit.clear_all();
        info!("AVC shut down");
    }

    /// Run a check
    ///
    /// Security server failures are returned as the outer error. A decision
    /// that was computed but could not be cached still yields a `Checked`
    /// so it can be audited.
    fn check(
        &self,
        key: AvcKey,
        requested: AccessVector,
        aeref: Option<&mut AvcEntryRef>,
    ) -> AvcResult<Checked> {
        let (avd, handle) = match self.fetch(key, requested, aeref)? {
            Fetched::Stored(avd, handle) => (avd, handle),
            Fetched::Unstored(avd, err) => {
                return Ok(Checked {
                    avd,
                    outcome: Err(err),
                })
            }
        };

        let denied = avd.denied(requested);
        if requested != 0 && denied == 0 {
            return Ok(Checked {
                avd,
                outcome: Ok(avd),
            });
        }

        if self.is_enforcing() {
            return Ok(Checked {
                avd,
                outcome: Err(AvcError::Denied {
                    ssid: key.ssid,
                    tsid: key.tsid,
                    tclass: key.tclass,
                    denied,
                }),
            });
        }

        // Permissive: remember the grant so the next check hits
        {
            let mut table = self.table.lock();
            let current = table.entry(handle).map_or(false, |entry| entry.key == key);
            let target = if current {
                Some(handle)
            } else {
                table.search(&key).0
            };
            if let Some(entry) = target.and_then(|h| table.entry_mut(h)) {
                apply_event(AvcEvent::Grant, entry, requested);
            }
        }
        debug!(
            ssid = key.ssid,
            tsid = key.tsid,
            tclass = key.tclass,
            denied,
            "Permissive mode, granting"
        );

        let mut widened = avd;
        widened.allowed |= requested;
        widened.decided |= requested;
        Ok(Checked {
            avd,
            outcome: Ok(widened),
        })
    }

    /// Decision covering `requested`, from the entry reference, the table or
    /// the security server
    ///
    /// Entry reference counters only move when the caller supplied one.
    fn fetch(
        &self,
        key: AvcKey,
        requested: AccessVector,
        mut aeref: Option<&mut AvcEntryRef>,
    ) -> AvcResult<Fetched> {
        {
            let mut table = self.table.lock();

            if let Some(aeref) = aeref.as_deref_mut() {
                self.stats.inc_entry_lookups();
                if let Some((handle, ref_key)) = aeref.get() {
                    if ref_key == key {
                        if let Some(entry) = table.entry_mut(handle) {
                            if entry.key == key && entry.avd.covers(requested) {
                                entry.used = true;
                                self.stats.inc_entry_hits();
                                return Ok(Fetched::Stored(entry.avd, handle));
                            }
                        }
                    }
                    self.stats.inc_entry_discards();
                    aeref.clear();
                }
                self.stats.inc_entry_misses();
            }

            if let Some((avd, handle)) = self.lookup_locked(&mut table, key, requested) {
                remember(&mut aeref, handle, key);
                return Ok(Fetched::Stored(avd, handle));
            }
        }

        let attempts = self.config.max_insert_retries;
        let mut last = None;
        for attempt in 1..=attempts {
            // Never call the security server with the table locked
            let avd = self
                .server
                .compute_av(key.ssid, key.tsid, key.tclass, requested)?;
            last = Some(avd);

            let mut table = self.table.lock();
            match table.insert(key, avd) {
                Ok(handle) => {
                    remember(&mut aeref, handle, key);
                    return Ok(Fetched::Stored(avd, handle));
                }
                Err(AvcError::StaleSequence { seqno, latest }) => {
                    debug!(seqno, latest, attempt, "Discarding stale decision");
                    if let Some((avd, handle)) = self.lookup_locked(&mut table, key, requested) {
                        remember(&mut aeref, handle, key);
                        return Ok(Fetched::Stored(avd, handle));
                    }
                }
                Err(err) => {
                    drop(table);
                    if matches!(err, AvcError::CapacityExhausted { .. }) {
                        self.warn_capacity();
                    }
                    return Ok(Fetched::Unstored(avd, err));
                }
            }
        }

        error!(attempts, ssid = key.ssid, tsid = key.tsid, "Stale insert retries exhausted");
        let err = AvcError::RetriesExhausted { attempts };
        match last {
            Some(avd) => Ok(Fetched::Unstored(avd, err)),
            None => Err(err),
        }
    }

    fn lookup_locked(
        &self,
        table: &mut CacheTable,
        key: AvcKey,
        requested: AccessVector,
    ) -> Option<(AccessVectorDecision, NodeHandle)> {
        let (found, probes) = table.search(&key);
        let hit = found.and_then(|handle| {
            table
                .entry(handle)
                .filter(|entry| entry.avd.covers(requested))
                .map(|entry| (entry.avd, handle))
        });
        self.stats.record_lookup(probes, hit.is_some());
        hit
    }

    fn warn_capacity(&self) {
        let now = Instant::now();
        let mut last = self.capacity_warned.lock();
        let due = match *last {
            Some(at) => now.duration_since(at) >= self.config.capacity_warn_interval,
            None => true,
        };
        if due {
            *last = Some(now);
            error!(
                max_nodes = self.config.max_nodes,
                "AVC cache exhausted, no reclaimable node"
            );
        }
    }
}
