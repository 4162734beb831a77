/*!
 * Cache Statistics
 * Lock-free counters for the entry-reference fast path and table lookups
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvcStats {
    pub entry_lookups: u64,
    pub entry_hits: u64,
    pub entry_misses: u64,
    pub entry_discards: u64,
    pub cav_lookups: u64,
    pub cav_hits: u64,
    pub cav_probes: u64,
    pub cav_misses: u64,
}

impl AvcStats {
    /// Table hit rate in percent
    pub fn hit_rate(&self) -> f64 {
        if self.cav_lookups == 0 {
            0.0
        } else {
            (self.cav_hits as f64 / self.cav_lookups as f64) * 100.0
        }
    }
}

impl fmt::Display for AvcStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "entry_lookups entry_hits entry_misses entry_discards cav_lookups cav_hits cav_probes cav_misses"
        )?;
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.entry_lookups,
            self.entry_hits,
            self.entry_misses,
            self.entry_discards,
            self.cav_lookups,
            self.cav_hits,
            self.cav_probes,
            self.cav_misses
        )
    }
}

/// Atomic cache statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with the table lock
/// - Relaxed increments; every permission check touches these
#[repr(C, align(64))]
#[derive(Default)]
pub struct AtomicAvcStats {
    entry_lookups: AtomicU64,
    entry_hits: AtomicU64,
    entry_misses: AtomicU64,
    entry_discards: AtomicU64,
    cav_lookups: AtomicU64,
    cav_hits: AtomicU64,
    cav_probes: AtomicU64,
    cav_misses: AtomicU64,
}

impl AtomicAvcStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn inc_entry_lookups(&self) {
        self.entry_lookups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_entry_hits(&self) {
        self.entry_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_entry_misses(&self) {
        self.entry_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_entry_discards(&self) {
        self.entry_discards.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one table lookup and the chain probes it took
    #[inline(always)]
    pub fn record_lookup(&self, probes: u32, hit: bool) {
        self.cav_lookups.fetch_add(1, Ordering::Relaxed);
        self.cav_probes.fetch_add(probes as u64, Ordering::Relaxed);
        if hit {
            self.cav_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cav_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.entry_lookups,
            &self.entry_hits,
            &self.entry_misses,
            &self.entry_discards,
            &self.cav_lookups,
            &self.cav_hits,
            &self.cav_probes,
            &self.cav_misses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of current stats
    ///
    /// # Note
    /// Counters are read independently and may be mutually inconsistent under
    /// concurrent checks. Acceptable for diagnostics.
    pub fn snapshot(&self) -> AvcStats {
        AvcStats {
            entry_lookups: self.entry_lookups.load(Ordering::Relaxed),
            entry_hits: self.entry_hits.load(Ordering::Relaxed),
            entry_misses: self.entry_misses.load(Ordering::Relaxed),
            entry_discards: self.entry_discards.load(Ordering::Relaxed),
            cav_lookups: self.cav_lookups.load(Ordering::Relaxed),
            cav_hits: self.cav_hits.load(Ordering::Relaxed),
            cav_probes: self.cav_probes.load(Ordering::Relaxed),
            cav_misses: self.cav_misses.load(Ordering::Relaxed),
        }
    }
}
