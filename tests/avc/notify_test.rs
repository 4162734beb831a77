/*!
 * Notification Tests
 * Grant, revoke, reset and audit toggles dispatched by the security server
 */

use crate::support::PolicyServer;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use security_avc::avc::classes::{file, SECCLASS_DIR, SECCLASS_FILE};
use security_avc::{
    AccessVectorCache, AccessVectorDecision, AvcError, AvcEvent, CallbackError, EventMask,
    SECSID_NULL, SECSID_WILD,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn cache_with(entries: &[(u32, u32, u16, u32)]) -> AccessVectorCache {
    let avc = AccessVectorCache::new(PolicyServer::new());
    for &(ssid, tsid, tclass, allowed) in entries {
        avc.insert(ssid, tsid, tclass, AccessVectorDecision::allow(allowed, 1))
            .unwrap();
    }
    avc
}

#[test]
fn test_grant_then_lookup_hits() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ)]);
    assert!(avc.lookup(1, 2, SECCLASS_FILE, file::EXECUTE).is_none());

    let retained = avc
        .dispatch(AvcEvent::Grant, 1, 2, SECCLASS_FILE, file::EXECUTE, 6)
        .unwrap();
    assert_eq!(retained, 0);

    let avd = avc.lookup(1, 2, SECCLASS_FILE, file::EXECUTE).unwrap();
    assert_eq!(avd.allowed & file::EXECUTE, file::EXECUTE);
    assert_eq!(avd.decided & file::EXECUTE, file::EXECUTE);
    assert_eq!(avc.latest_notif(), 6);
}

#[test]
fn test_wildcard_revoke_coverage() {
    let avc = cache_with(&[
        (1, 9, SECCLASS_FILE, file::READ | file::WRITE),
        (2, 9, SECCLASS_FILE, file::READ | file::WRITE),
        (3, 8, SECCLASS_FILE, file::READ | file::WRITE),
        (4, 9, SECCLASS_DIR, file::READ | file::WRITE),
    ]);

    avc.dispatch(AvcEvent::Revoke, SECSID_WILD, 9, SECCLASS_FILE, file::WRITE, 2)
        .unwrap();

    let allowed = |ssid, tsid, tclass| avc.lookup(ssid, tsid, tclass, 0).unwrap().allowed;
    assert_eq!(allowed(1, 9, SECCLASS_FILE), file::READ);
    assert_eq!(allowed(2, 9, SECCLASS_FILE), file::READ);
    assert_eq!(allowed(3, 8, SECCLASS_FILE), file::READ | file::WRITE);
    assert_eq!(allowed(4, 9, SECCLASS_DIR), file::READ | file::WRITE);
}

#[test]
fn test_try_revoke_retention() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ | file::WRITE | file::APPEND)]);
    avc.add_callback(
        |_, _, _, _, perms| Ok(perms & file::READ),
        AvcEvent::TryRevoke.into(),
        SECSID_WILD,
        SECSID_WILD,
        SECCLASS_FILE,
        file::READ | file::WRITE,
    );

    let retained = avc
        .ss_try_revoke(1, 2, SECCLASS_FILE, file::READ | file::WRITE | file::APPEND, 3)
        .unwrap();
    assert_eq!(retained, file::READ);

    let avd = avc.lookup(1, 2, SECCLASS_FILE, 0).unwrap();
    assert_eq!(avd.allowed, file::READ);
    assert_eq!(avc.latest_notif(), 3);
}

#[test]
fn test_try_revoke_without_handlers_clears_all() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ | file::WRITE)]);
    let retained = avc
        .dispatch(AvcEvent::TryRevoke, 1, 2, SECCLASS_FILE, file::WRITE, 2)
        .unwrap();
    assert_eq!(retained, 0);
    assert_eq!(avc.lookup(1, 2, SECCLASS_FILE, 0).unwrap().allowed, file::READ);
}

#[test]
fn test_reset_clears_everything() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ), (3, 4, SECCLASS_DIR, file::READ)]);
    avc.lookup(1, 2, SECCLASS_FILE, file::READ);

    let resets = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resets);
    avc.add_callback(
        move |event, ssid, tsid, _, perms| {
            assert_eq!(event, AvcEvent::Reset);
            assert_eq!((ssid, tsid, perms), (SECSID_NULL, SECSID_NULL, 0));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        },
        AvcEvent::Reset.into(),
        SECSID_WILD,
        SECSID_WILD,
        SECCLASS_FILE,
        0,
    );

    avc.dispatch(AvcEvent::Reset, 0, 0, 0, 0, 10).unwrap();
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(avc.stats(), Default::default());
    assert_eq!(avc.active_nodes(), 0);
    assert_eq!(avc.latest_notif(), 10);

    assert!(avc.lookup(1, 2, SECCLASS_FILE, file::READ).is_none());
    assert!(avc.lookup(3, 4, SECCLASS_DIR, file::READ).is_none());
}

#[test]
fn test_reset_callback_failure_reported() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ)]);
    avc.add_callback(
        |_, _, _, _, _| Err(CallbackError::new("policy load failed")),
        AvcEvent::Reset.into(),
        SECSID_WILD,
        SECSID_WILD,
        0,
        0,
    );

    let err = avc.ss_reset(4).unwrap_err();
    assert_eq!(
        err,
        AvcError::Callback {
            event: AvcEvent::Reset,
            reason: "policy load failed".into(),
        }
    );
    // The flush itself is not rolled back
    assert_eq!(avc.active_nodes(), 0);
}

#[test]
fn test_callback_failure_stops_dispatch() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ)]);
    let later = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&later);

    avc.add_callback(
        |_, _, _, _, _| Err(CallbackError::new("busy")),
        AvcEvent::Grant.into(),
        1,
        2,
        SECCLASS_FILE,
        file::WRITE,
    );
    avc.add_callback(
        move |_, _, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        },
        AvcEvent::Grant.into(),
        1,
        2,
        SECCLASS_FILE,
        file::WRITE,
    );

    let err = avc.ss_grant(1, 2, SECCLASS_FILE, file::WRITE, 2).unwrap_err();
    assert_eq!(err.errno(), security_avc::avc::types::EIO);
    assert_eq!(later.load(Ordering::SeqCst), 0);
    // Cache edit happened before the callbacks ran
    assert!(avc.lookup(1, 2, SECCLASS_FILE, file::WRITE).is_some());
}

#[test]
fn test_callback_filters_and_removal() {
    let avc = cache_with(&[]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    let handle = avc.add_callback(
        move |event, ssid, tsid, tclass, perms| {
            log.lock().push((event, ssid, tsid, tclass, perms));
            Ok(0)
        },
        AvcEvent::Grant | AvcEvent::Revoke,
        5,
        SECSID_WILD,
        SECCLASS_FILE,
        file::READ | file::WRITE,
    );

    avc.ss_grant(5, 6, SECCLASS_FILE, file::WRITE | file::APPEND, 1).unwrap();
    avc.ss_grant(5, 6, SECCLASS_DIR, file::WRITE, 2).unwrap();
    avc.ss_grant(7, 6, SECCLASS_FILE, file::WRITE, 3).unwrap();
    avc.ss_grant(5, 6, SECCLASS_FILE, file::APPEND, 4).unwrap();
    avc.ss_set_auditallow(5, 6, SECCLASS_FILE, file::READ, 5, true).unwrap();
    avc.ss_revoke(5, 6, SECCLASS_FILE, file::READ, 6).unwrap();

    assert!(avc.remove_callback(handle));
    avc.ss_revoke(5, 6, SECCLASS_FILE, file::READ, 7).unwrap();

    // Handlers only see the permissions they registered for
    assert_eq!(
        *seen.lock(),
        vec![
            (AvcEvent::Grant, 5, 6, SECCLASS_FILE, file::WRITE),
            (AvcEvent::Revoke, 5, 6, SECCLASS_FILE, file::READ),
        ]
    );
}

#[test]
fn test_callback_may_register_from_handler() {
    let avc = cache_with(&[]);
    let inner = avc.clone();
    avc.add_callback(
        move |_, _, _, _, _| {
            inner.add_callback(|_, _, _, _, _| Ok(0), EventMask::ALL, 1, 1, 1, 1);
            Ok(0)
        },
        AvcEvent::Grant.into(),
        1,
        2,
        SECCLASS_FILE,
        file::READ,
    );

    avc.ss_grant(1, 2, SECCLASS_FILE, file::READ, 1).unwrap();
    avc.shutdown();
}

#[test]
fn test_audit_toggles_edit_entries() {
    let avc = cache_with(&[(1, 2, SECCLASS_FILE, file::READ)]);

    avc.ss_set_auditallow(1, 2, SECCLASS_FILE, file::READ, 2, true).unwrap();
    avc.ss_set_auditdeny(1, 2, SECCLASS_FILE, file::WRITE, 2, false).unwrap();
    let avd = avc.lookup(1, 2, SECCLASS_FILE, 0).unwrap();
    assert_eq!(avd.auditallow, file::READ);
    assert_eq!(avd.auditdeny, !file::WRITE);

    avc.dispatch(AvcEvent::AuditAllowDisable, 1, 2, SECCLASS_FILE, file::READ, 3)
        .unwrap();
    avc.dispatch(AvcEvent::AuditDenyEnable, 1, 2, SECCLASS_FILE, file::WRITE, 3)
        .unwrap();
    let avd = avc.lookup(1, 2, SECCLASS_FILE, 0).unwrap();
    assert_eq!(avd.auditallow, 0);
    assert_eq!(avd.auditdeny, u32::MAX);
}

#[test]
fn test_notification_sequence_never_regresses() {
    let avc = cache_with(&[]);
    avc.ss_revoke(1, 2, SECCLASS_FILE, file::READ, 9).unwrap();
    avc.ss_grant(1, 2, SECCLASS_FILE, file::READ, 4).unwrap();
    assert_eq!(avc.latest_notif(), 9);
}
