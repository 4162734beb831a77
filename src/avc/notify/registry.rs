/*!
 * Callback Registry
 * Parties interested in policy change notifications
 */

use crate::avc::types::{AvcEvent, CallbackResult, EventMask};
use crate::core::types::{sidcmp, AccessVector, SecurityClass, Sid};
use arc_swap::ArcSwap;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Notification handler
///
/// Receives the event and its filters and returns the subset of `perms` it
/// retains (still in use). Handlers must return promptly.
pub type CallbackFn = Arc<
    dyn Fn(AvcEvent, Sid, Sid, SecurityClass, AccessVector) -> CallbackResult<AccessVector>
        + Send
        + Sync,
>;

/// Identifies a registration for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackHandle(u64);

pub(crate) struct Registration {
    pub(crate) handle: CallbackHandle,
    pub(crate) events: EventMask,
    pub(crate) ssid: Sid,
    pub(crate) tsid: Sid,
    pub(crate) tclass: SecurityClass,
    pub(crate) perms: AccessVector,
    pub(crate) callback: CallbackFn,
}

impl Registration {
    /// Whether this registration wants `event` for the given filters
    pub(crate) fn matches(
        &self,
        event: AvcEvent,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
    ) -> bool {
        self.events.contains(event)
            && sidcmp(self.ssid, ssid)
            && sidcmp(self.tsid, tsid)
            && self.tclass == tclass
            && self.perms & perms != 0
    }
}

/// Registered notification callbacks
///
/// Dispatch reads a snapshot of the list, so handlers may register or remove
/// callbacks without deadlocking.
pub struct CallbackRegistry {
    registrations: ArcSwap<Vec<Arc<Registration>>>,
    next_id: AtomicU64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            registrations: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for the events in `events`
    pub fn register<F>(
        &self,
        callback: F,
        events: EventMask,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
    ) -> CallbackHandle
    where
        F: Fn(AvcEvent, Sid, Sid, SecurityClass, AccessVector) -> CallbackResult<AccessVector>
            + Send
            + Sync
            + 'static,
    {
        let handle = CallbackHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        let registration = Arc::new(Registration {
            handle,
            events,
            ssid,
            tsid,
            tclass,
            perms,
            callback: Arc::new(callback),
        });

        self.registrations.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&registration));
            next
        });
        info!(
            "Registered AVC callback {} (events {:#x}, class {})",
            handle.0,
            events.bits(),
            tclass
        );
        handle
    }

    /// Remove exactly one registration
    pub fn unregister(&self, handle: CallbackHandle) -> bool {
        let previous = self.registrations.rcu(|current| {
            current
                .iter()
                .filter(|r| r.handle != handle)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|r| r.handle == handle);
        if removed {
            info!("Unregistered AVC callback {}", handle.0);
        }
        removed
    }

    /// Registrations interested in an event, in registration order
    pub(crate) fn matching(
        &self,
        event: AvcEvent,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
    ) -> Vec<Arc<Registration>> {
        let snapshot = self.registrations.load();
        let matched: Vec<_> = snapshot
            .iter()
            .filter(|r| r.matches(event, ssid, tsid, tclass, perms))
            .cloned()
            .collect();
        debug!(
            "{} of {} AVC callbacks match {}",
            matched.len(),
            snapshot.len(),
            event
        );
        matched
    }

    /// Registrations subscribed to an event regardless of their filters
    pub(crate) fn subscribed(&self, event: AvcEvent) -> Vec<Arc<Registration>> {
        self.registrations
            .load()
            .iter()
            .filter(|r| r.events.contains(event))
            .cloned()
            .collect()
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.registrations.store(Arc::new(Vec::new()));
    }

    pub fn count(&self) -> usize {
        self.registrations.load().len()
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
