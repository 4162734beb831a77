/*!
 * AVC Types Module
 * Core types, errors and traits for the access vector cache
 */

mod core;
mod errors;
mod traits;

pub use self::core::{AccessVectorDecision, AvcEvent, EventMask};
pub use errors::{
    AvcError, AvcResult, CallbackError, CallbackResult, SecurityServerError, EACCES, EAGAIN, EINVAL,
    EIO, ENOMEM,
};
pub use traits::SecurityServer;
