/*!
 * Decision Cache
 * Hash table, node arena and counters behind the permission-check facade
 */

mod stats;
mod table;

pub use stats::{AtomicAvcStats, AvcStats};
pub use table::{AvcEntry, AvcKey, CacheTable, HashStats, NodeHandle};
