/*!
 * Policy Change Dispatch
 * Applies security server notifications to cached entries and registered callbacks
 */

use super::registry::CallbackHandle;
use crate::avc::cache::{AvcEntry, AvcKey, CacheTable};
use crate::avc::manager::AccessVectorCache;
use crate::avc::types::{AvcError, AvcEvent, AvcResult, CallbackResult, EventMask};
use crate::core::types::{
    sidcmp, AccessVector, SecurityClass, SeqNo, Sid, SECSID_NULL, SECSID_WILD,
};
use crate::monitoring::NotificationSpan;
use tracing::{debug, info, warn};

/// Edit one entry's bitmasks for an event
pub(crate) fn apply_event(event: AvcEvent, entry: &mut AvcEntry, perms: AccessVector) {
    let avd = &mut entry.avd;
    match event {
        AvcEvent::Grant => {
            avd.allowed |= perms;
            avd.decided |= perms;
        }
        AvcEvent::TryRevoke | AvcEvent::Revoke => avd.allowed &= !perms,
        AvcEvent::AuditAllowEnable => avd.auditallow |= perms,
        AvcEvent::AuditAllowDisable => avd.auditallow &= !perms,
        AvcEvent::AuditDenyEnable => avd.auditdeny |= perms,
        AvcEvent::AuditDenyDisable => avd.auditdeny &= !perms,
        AvcEvent::Reset => {}
    }
}

/// Apply an event to every entry matching the filters
///
/// Exact filters go through the hash chain; wildcards walk the whole table.
fn update_entries(
    table: &mut CacheTable,
    event: AvcEvent,
    ssid: Sid,
    tsid: Sid,
    tclass: SecurityClass,
    perms: AccessVector,
) -> usize {
    if ssid == SECSID_WILD || tsid == SECSID_WILD {
        return table.for_each_matching(
            |key| sidcmp(ssid, key.ssid) && sidcmp(tsid, key.tsid) && key.tclass == tclass,
            |entry| apply_event(event, entry, perms),
        );
    }

    let (found, _) = table.search(&AvcKey::new(ssid, tsid, tclass));
    match found.and_then(|handle| table.entry_mut(handle)) {
        Some(entry) => {
            apply_event(event, entry, perms);
            1
        }
        None => 0,
    }
}

impl AccessVectorCache {
    /// Register a policy change handler
    ///
    /// The handler is invoked for events in `events` whose filters match the
    /// registration (wildcard SIDs match anything, the class must be equal and
    /// the permissions must intersect). Reset handlers ignore the filters.
    pub fn add_callback<F>(
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
        self.callbacks
            .register(callback, events, ssid, tsid, tclass, perms)
    }

    pub fn remove_callback(&self, handle: CallbackHandle) -> bool {
        self.callbacks.unregister(handle)
    }

    /// Route a security server notification
    ///
    /// Returns the permissions retained by callbacks for `TryRevoke`, zero
    /// otherwise.
    pub fn dispatch(
        &self,
        event: AvcEvent,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
    ) -> AvcResult<AccessVector> {
        match event {
            AvcEvent::Reset => self.ss_reset(seqno).map(|()| 0),
            AvcEvent::TryRevoke => self.ss_try_revoke(ssid, tsid, tclass, perms, seqno),
            _ => self
                .update_and_notify(event, ssid, tsid, tclass, perms, seqno)
                .map(|()| 0),
        }
    }

    /// Grant previously denied permissions
    pub fn ss_grant(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
    ) -> AvcResult<()> {
        self.update_and_notify(AvcEvent::Grant, ssid, tsid, tclass, perms, seqno)
    }

    /// Revoke permissions that callbacks do not retain
    ///
    /// Callbacks run first; only `perms` minus the retained set is cleared.
    /// Returns the retained set.
    pub fn ss_try_revoke(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
    ) -> AvcResult<AccessVector> {
        let span = NotificationSpan::new(AvcEvent::TryRevoke, seqno);
        let retained = self.notify(&span, AvcEvent::TryRevoke, ssid, tsid, tclass, perms)?;
        let revoked = perms & !retained;

        let touched = {
            let mut table = self.table.lock();
            let touched = if revoked != 0 {
                update_entries(&mut table, AvcEvent::TryRevoke, ssid, tsid, tclass, revoked)
            } else {
                0
            };
            table.update_latest_notif(seqno);
            touched
        };
        span.record_touched(touched);
        debug!(
            ssid,
            tsid,
            tclass,
            retained,
            revoked,
            touched,
            seqno,
            "AVC try_revoke applied"
        );
        Ok(retained)
    }

    /// Revoke permissions unconditionally
    pub fn ss_revoke(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
    ) -> AvcResult<()> {
        self.update_and_notify(AvcEvent::Revoke, ssid, tsid, tclass, perms, seqno)
    }

    /// Flush every cached decision after a policy reload
    ///
    /// Statistics are zeroed with the flush. Reset handlers run afterwards,
    /// outside the table lock.
    pub fn ss_reset(&self, seqno: SeqNo) -> AvcResult<()> {
        let span = NotificationSpan::new(AvcEvent::Reset, seqno);
        {
            let mut table = self.table.lock();
            table.flush();
            table.update_latest_notif(seqno);
            self.stats.reset();
        }
        info!(seqno, "AVC cache reset");

        let handlers = self.callbacks.subscribed(AvcEvent::Reset);
        span.record_callbacks(handlers.len());
        for registration in handlers {
            (registration.callback)(AvcEvent::Reset, SECSID_NULL, SECSID_NULL, 0, 0).map_err(
                |err| {
                    warn!(reason = %err, "AVC reset callback failed");
                    AvcError::callback(AvcEvent::Reset, err)
                },
            )?;
        }
        Ok(())
    }

    /// Enable or disable auditing of granted permissions
    pub fn ss_set_auditallow(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
        enable: bool,
    ) -> AvcResult<()> {
        let event = if enable {
            AvcEvent::AuditAllowEnable
        } else {
            AvcEvent::AuditAllowDisable
        };
        self.update_and_notify(event, ssid, tsid, tclass, perms, seqno)
    }

    /// Enable or disable auditing of denied permissions
    pub fn ss_set_auditdeny(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
        enable: bool,
    ) -> AvcResult<()> {
        let event = if enable {
            AvcEvent::AuditDenyEnable
        } else {
            AvcEvent::AuditDenyDisable
        };
        self.update_and_notify(event, ssid, tsid, tclass, perms, seqno)
    }

    /// Edit the cache, then tell interested callbacks
    fn update_and_notify(
        &self,
        event: AvcEvent,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
        seqno: SeqNo,
    ) -> AvcResult<()> {
        let span = NotificationSpan::new(event, seqno);
        let touched = {
            let mut table = self.table.lock();
            let touched = update_entries(&mut table, event, ssid, tsid, tclass, perms);
            table.update_latest_notif(seqno);
            touched
        };
        span.record_touched(touched);
        debug!(%event, ssid, tsid, tclass, perms, touched, seqno, "AVC entries updated");

        self.notify(&span, event, ssid, tsid, tclass, perms)
            .map(|_| ())
    }

    /// Invoke matching callbacks in registration order, OR-ing what they retain
    ///
    /// The first failure stops dispatch; earlier edits stay applied.
    fn notify(
        &self,
        span: &NotificationSpan,
        event: AvcEvent,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        perms: AccessVector,
    ) -> AvcResult<AccessVector> {
        let matched = self.callbacks.matching(event, ssid, tsid, tclass, perms);
        span.record_callbacks(matched.len());

        let mut retained = 0;
        for registration in matched {
            let kept = (registration.callback)(
                event,
                ssid,
                tsid,
                tclass,
                perms & registration.perms,
            )
            .map_err(|err| {
                warn!(%event, reason = %err, "AVC callback failed");
                AvcError::callback(event, err)
            })?;
            retained |= kept;
        }
        Ok(retained & perms)
    }
}
