/*!
 * Cache Limits and Constants
 *
 * Centralized location for cache geometry, retry bounds and audit history sizes.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Security-critical constants are marked with [SECURITY]
 */

use std::time::Duration;

// =============================================================================
// CACHE GEOMETRY
// =============================================================================

/// Number of hash chains in the cache table
/// Must be a power of two, the hash is reduced with a mask
/// [PERF]
pub const AVC_CACHE_SLOTS: usize = 512;

/// Size of the pre-allocated node pool
/// Kept below the slot count so chains stay short under normal load
/// [PERF]
pub const AVC_CACHE_MAXNODES: usize = 410;

// =============================================================================
// PERMISSION CHECKS
// =============================================================================

/// Compute-and-insert attempts before a check gives up with EAGAIN
/// [SECURITY] Bounds livelock while policy reloads race with checks
pub const AVC_MAX_INSERT_RETRIES: u32 = 8;

/// Minimum interval between two "cache capacity exhausted" warnings
pub const AVC_CAPACITY_WARN_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// AUDIT
// =============================================================================

/// Audit records kept in memory for inspection
pub const MAX_AUDIT_EVENTS: usize = 1000;
