/*!
 * AVC Types
 * Decisions, notification events and the event mask used by callback registrations
 */

use crate::core::types::{AccessVector, SeqNo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Access vector decision computed by the security server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccessVectorDecision {
    /// Permissions granted
    pub allowed: AccessVector,
    /// Permissions this decision covers
    pub decided: AccessVector,
    /// Granted permissions that must be audited
    pub auditallow: AccessVector,
    /// Denied permissions that must be audited
    pub auditdeny: AccessVector,
    /// Policy revision the decision was computed against
    pub seqno: SeqNo,
}

impl AccessVectorDecision {
    /// Decision that allows and decides exactly `allowed`, auditing every denial
    pub fn allow(allowed: AccessVector, seqno: SeqNo) -> Self {
        Self {
            allowed,
            decided: allowed,
            auditallow: 0,
            auditdeny: AccessVector::MAX,
            seqno,
        }
    }

    /// Whether this decision covers every requested bit
    #[inline]
    pub fn covers(&self, requested: AccessVector) -> bool {
        self.decided & requested == requested
    }

    /// Requested bits not granted by this decision
    #[inline]
    pub fn denied(&self, requested: AccessVector) -> AccessVector {
        requested & !self.allowed
    }

    pub fn with_decided(mut self, decided: AccessVector) -> Self {
        self.decided = decided;
        self
    }

    pub fn with_auditallow(mut self, auditallow: AccessVector) -> Self {
        self.auditallow = auditallow;
        self
    }

    pub fn with_auditdeny(mut self, auditdeny: AccessVector) -> Self {
        self.auditdeny = auditdeny;
        self
    }
}

/// Policy change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvcEvent {
    Grant,
    TryRevoke,
    Revoke,
    Reset,
    AuditAllowEnable,
    AuditAllowDisable,
    AuditDenyEnable,
    AuditDenyDisable,
}

impl AvcEvent {
    pub const ALL: [AvcEvent; 8] = [
        AvcEvent::Grant,
        AvcEvent::TryRevoke,
        AvcEvent::Revoke,
        AvcEvent::Reset,
        AvcEvent::AuditAllowEnable,
        AvcEvent::AuditAllowDisable,
        AvcEvent::AuditDenyEnable,
        AvcEvent::AuditDenyDisable,
    ];

    /// Bit this event occupies in an [`EventMask`]
    #[inline]
    pub const fn bit(self) -> u32 {
        match self {
            AvcEvent::Grant => 1,
            AvcEvent::TryRevoke => 2,
            AvcEvent::Revoke => 4,
            AvcEvent::Reset => 8,
            AvcEvent::AuditAllowEnable => 16,
            AvcEvent::AuditAllowDisable => 32,
            AvcEvent::AuditDenyEnable => 64,
            AvcEvent::AuditDenyDisable => 128,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AvcEvent::Grant => "grant",
            AvcEvent::TryRevoke => "try_revoke",
            AvcEvent::Revoke => "revoke",
            AvcEvent::Reset => "reset",
            AvcEvent::AuditAllowEnable => "auditallow_enable",
            AvcEvent::AuditAllowDisable => "auditallow_disable",
            AvcEvent::AuditDenyEnable => "auditdeny_enable",
            AvcEvent::AuditDenyDisable => "auditdeny_disable",
        }
    }
}

impl fmt::Display for AvcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of events a callback registration listens for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const ALL: EventMask = EventMask(0xFF);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn with(self, event: AvcEvent) -> Self {
        Self(self.0 | event.bit())
    }

    #[inline]
    pub const fn contains(self, event: AvcEvent) -> bool {
        self.0 & event.bit() != 0
    }
}

impl From<AvcEvent> for EventMask {
    fn from(event: AvcEvent) -> Self {
        EventMask(event.bit())
    }
}

impl FromIterator<AvcEvent> for EventMask {
    fn from_iter<I: IntoIterator<Item = AvcEvent>>(iter: I) -> Self {
        iter.into_iter().fold(EventMask::NONE, EventMask::with)
    }
}

impl std::ops::BitOr<AvcEvent> for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: AvcEvent) -> EventMask {
        self.with(rhs)
    }
}

impl std::ops::BitOr for AvcEvent {
    type Output = EventMask;

    fn bitor(self, rhs: AvcEvent) -> EventMask {
        EventMask::from(self).with(rhs)
    }
}
