/*!
 * Core Module
 * Fundamental security identifiers and tuning limits
 */

pub mod limits;
pub mod types;

pub use types::*;
