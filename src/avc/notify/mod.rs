/*!
 * Policy Change Notifications
 * Callback registrations and the security server notification entry points
 */

mod dispatch;
mod registry;

pub(crate) use dispatch::apply_event;
pub use registry::{CallbackFn, CallbackHandle, CallbackRegistry};
