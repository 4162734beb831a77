/*!
 * Monitoring
 * Tracing setup and notification spans
 */

mod tracer;

pub use tracer::{init_tracing, NotificationSpan};
