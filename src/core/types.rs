/*!
 * Core Types
 * Identifier and bitmask types shared by the cache, notification and audit paths
 */

/// Security identifier naming a security context
pub type Sid = u32;

/// Object class (file, socket, process, ...)
pub type SecurityClass = u16;

/// Permission bitmask, interpreted per class
pub type AccessVector = u32;

/// Process ID type
pub type Pid = u32;

/// Policy revision number
pub type SeqNo = u32;

/// Never a valid SID; cleared cache nodes carry it
pub const SECSID_NULL: Sid = 0;

/// Matches any SID in notification dispatch
pub const SECSID_WILD: Sid = 0xFFFF_FFFF;

/// Wildcard-aware SID comparison used by notification matching
#[inline]
pub fn sidcmp(x: Sid, y: Sid) -> bool {
    x == y || x == SECSID_WILD || y == SECSID_WILD
}
