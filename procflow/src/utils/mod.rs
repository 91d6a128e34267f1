//! Utility functions for identifiers, timestamps and name validation.

pub mod timestamps;
mod uuid_utils;
pub mod validation;

pub use timestamps::{duration_ms, iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::generate_uuid;
pub use validation::{validate_stage_name, validate_unique_names};
