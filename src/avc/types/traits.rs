/*!
 * AVC Traits
 * Interfaces between the cache and the policy decision engine
 */

use super::core::AccessVectorDecision;
use super::errors::SecurityServerError;
use crate::core::types::{AccessVector, SecurityClass, Sid};

/// Policy decision engine consulted on cache misses
///
/// Calls may block; the cache never holds its table lock across them.
pub trait SecurityServer: Send + Sync {
    /// Compute the access decision for a (source, target, class) triple
    fn compute_av(
        &self,
        ssid: Sid,
        tsid: Sid,
        tclass: SecurityClass,
        requested: AccessVector,
    ) -> Result<AccessVectorDecision, SecurityServerError>;

    /// Human-readable security context for audit output
    fn sid_to_context(&self, sid: Sid) -> Result<String, SecurityServerError>;
}
