/*!
 * Entry Reference
 * Per-call-site memo of the last cache node used
 */

use super::cache::{AvcKey, NodeHandle};

/// Remembers which cache node served the previous check at a call site
///
/// The handle is only a hint: the node may have been reclaimed or reset since,
/// so every use re-validates the key under the cache lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvcEntryRef {
    target: Option<(NodeHandle, AvcKey)>,
}

impl AvcEntryRef {
    pub const fn new() -> Self {
        Self { target: None }
    }

    pub fn is_set(&self) -> bool {
        self.target.is_some()
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    pub(crate) fn get(&self) -> Option<(NodeHandle, AvcKey)> {
        self.target
    }

    pub(crate) fn set(&mut self, handle: NodeHandle, key: AvcKey) {
        self.target = Some((handle, key));
    }
}
