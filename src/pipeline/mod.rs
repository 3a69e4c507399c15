//! Load pipeline stages.
//!
//! - `load`: Source fallback, validity, default fallback
//! - `expiry`: Expiry filtering and calendar conversion

pub mod expiry;
pub mod load;

pub use expiry::{ExpiryFilter, jalali_to_gregorian, parse_expiry};
pub use load::{SourceLoader, build_active_list, select_valid, with_default_fallback};
