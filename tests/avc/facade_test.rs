/*!
 * Permission Check Tests
 * Lookup, insert and has_perm through the public cache facade
 */

use crate::support::PolicyServer;
use pretty_assertions::assert_eq;
use security_avc::avc::classes::{file, SECCLASS_DIR, SECCLASS_FILE};
use security_avc::{
    AccessVectorCache, AccessVectorDecision, AvcConfig, AvcEntryRef, AvcError, SecurityServerError,
};

#[test]
fn test_end_to_end_cached_decision() {
    let server = PolicyServer::new();
    server.set_seqno(5);
    server.allow(1, 2, SECCLASS_FILE, file::READ | file::WRITE | file::EXECUTE);
    let avc = AccessVectorCache::new(server.clone());

    let avd = AccessVectorDecision {
        allowed: file::READ | file::WRITE,
        decided: file::READ | file::WRITE,
        auditallow: 0,
        auditdeny: file::WRITE,
        seqno: 5,
    };
    avc.insert(1, 2, SECCLASS_FILE, avd).unwrap();

    let granted = avc
        .has_perm(1, 2, SECCLASS_FILE, file::WRITE, None, None)
        .unwrap();
    assert_eq!(granted, avd);
    assert_eq!(server.calls(), 0);

    // EXECUTE is outside `decided`, so the server is asked
    avc.has_perm(1, 2, SECCLASS_FILE, file::EXECUTE, None, None)
        .unwrap();
    assert_eq!(server.calls(), 1);

    avc.has_perm(1, 2, SECCLASS_FILE, file::EXECUTE, None, None)
        .unwrap();
    assert_eq!(server.calls(), 1);
    assert_eq!(avc.active_nodes(), 1);
}

#[test]
fn test_lookup_hit_implies_coverage() {
    let avc = AccessVectorCache::new(PolicyServer::new());
    avc.insert(
        1,
        2,
        SECCLASS_FILE,
        AccessVectorDecision::allow(file::READ, 0).with_decided(file::READ | file::GETATTR),
    )
    .unwrap();

    let hit = avc.lookup(1, 2, SECCLASS_FILE, file::GETATTR).unwrap();
    assert_eq!(hit.decided & file::GETATTR, file::GETATTR);
    assert!(avc.lookup(1, 2, SECCLASS_FILE, file::WRITE).is_none());
    assert!(avc.lookup(1, 2, SECCLASS_DIR, file::READ).is_none());

    let stats = avc.stats();
    assert_eq!(stats.cav_lookups, 3);
    assert_eq!(stats.cav_hits, 1);
    assert_eq!(stats.cav_misses, 2);
}

#[test]
fn test_stale_insert_rejected() {
    let avc = AccessVectorCache::new(PolicyServer::new());
    avc.ss_grant(1, 2, SECCLASS_FILE, file::READ, 7).unwrap();

    let err = avc
        .insert(1, 2, SECCLASS_FILE, AccessVectorDecision::allow(file::READ, 6))
        .unwrap_err();
    assert_eq!(err, AvcError::StaleSequence { seqno: 6, latest: 7 });
    assert_eq!(err.errno(), security_avc::avc::types::EAGAIN);
    assert_eq!(avc.active_nodes(), 0);
}

#[test]
fn test_enforcing_versus_permissive() {
    let server = PolicyServer::new();
    server.allow(3, 4, SECCLASS_FILE, file::READ);

    let enforcing = AccessVectorCache::new(server.clone());
    let err = enforcing
        .has_perm_noaudit(3, 4, SECCLASS_FILE, file::READ | file::WRITE, None)
        .unwrap_err();
    assert_eq!(
        err,
        AvcError::Denied {
            ssid: 3,
            tsid: 4,
            tclass: SECCLASS_FILE,
            denied: file::WRITE,
        }
    );
    assert_eq!(err.errno(), security_avc::avc::types::EACCES);

    let config = AvcConfig::default().with_enforcing(false);
    let permissive = AccessVectorCache::with_config(config, server).unwrap();
    let avd = permissive
        .has_perm_noaudit(3, 4, SECCLASS_FILE, file::READ | file::WRITE, None)
        .unwrap();
    assert_eq!(avd.allowed, file::READ | file::WRITE);
    let cached = permissive.lookup(3, 4, SECCLASS_FILE, file::WRITE).unwrap();
    assert_eq!(cached.allowed, file::READ | file::WRITE);
}

#[test]
fn test_toggle_enforcing_at_runtime() {
    let avc = AccessVectorCache::new(PolicyServer::new());
    assert!(avc.is_enforcing());
    assert!(avc
        .has_perm_noaudit(1, 2, SECCLASS_FILE, file::READ, None)
        .is_err());

    avc.set_enforcing(false);
    assert!(!avc.is_enforcing());
    assert!(avc
        .has_perm_noaudit(1, 2, SECCLASS_FILE, file::READ, None)
        .is_ok());
}

#[test]
fn test_entry_ref_reused_then_discarded() {
    let server = PolicyServer::new();
    server.allow(1, 2, SECCLASS_FILE, file::READ | file::WRITE);
    let avc = AccessVectorCache::new(server);
    let mut aeref = AvcEntryRef::new();

    for _ in 0..3 {
        avc.has_perm_noaudit(1, 2, SECCLASS_FILE, file::READ, Some(&mut aeref))
            .unwrap();
    }
    // Same call site, different key
    avc.has_perm_noaudit(1, 5, SECCLASS_FILE, file::READ, Some(&mut aeref))
        .unwrap_err();

    let stats = avc.stats();
    assert_eq!(stats.entry_lookups, 4);
    assert_eq!(stats.entry_hits, 2);
    assert_eq!(stats.entry_misses, 2);
    assert_eq!(stats.entry_discards, 1);
    assert!(aeref.is_set());
}

#[test]
fn test_security_server_failure_propagates() {
    let server = PolicyServer::new();
    server.unload();
    let avc = AccessVectorCache::new(server);

    let err = avc
        .has_perm(1, 2, SECCLASS_FILE, file::READ, None, None)
        .unwrap_err();
    assert_eq!(err, AvcError::SecurityServer(SecurityServerError::NotLoaded));
    assert!(!err.is_denied());
    assert_eq!(avc.active_nodes(), 0);
    assert_eq!(avc.audit_log().stats().total_logged, 0);
}

#[test]
fn test_clones_share_state() {
    let server = PolicyServer::new();
    server.allow(1, 2, SECCLASS_FILE, file::READ);
    let avc = AccessVectorCache::new(server.clone());
    let other = avc.clone();

    avc.has_perm_noaudit(1, 2, SECCLASS_FILE, file::READ, None)
        .unwrap();
    other
        .has_perm_noaudit(1, 2, SECCLASS_FILE, file::READ, None)
        .unwrap();
    assert_eq!(server.calls(), 1);
    assert_eq!(other.stats().cav_hits, 1);
}

#[test]
fn test_small_cache_recycles_nodes() {
    let server = PolicyServer::new();
    for tsid in 0..64 {
        server.allow(1, tsid, SECCLASS_FILE, file::READ);
    }
    let config = AvcConfig::default().with_geometry(8, 4);
    let avc = AccessVectorCache::with_config(config, server).unwrap();

    for tsid in 0..64 {
        avc.has_perm_noaudit(1, tsid, SECCLASS_FILE, file::READ, None)
            .unwrap();
    }
    assert_eq!(avc.active_nodes(), 4);

    let hash = avc.hash_eval();
    assert_eq!(hash.entries, 4);
    assert_eq!(hash.slots_total, 8);
    assert!(hash.longest_chain >= 1);
}
