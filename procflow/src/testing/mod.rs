//! Testing utilities for procflow pipelines.
//!
//! This module provides:
//! - Mock operations that record or fail
//! - Assertions for slots, parameters and configuration errors
//! - Image and arithmetic fixtures

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_config_error, assert_resolves_to, assert_slot_value};
pub use fixtures::{
    adder_chain, add_operation, gradient_image, grayscale_operation, image_pipeline,
    load_operation, threshold_operation,
};
pub use mocks::{ConstOperation, FailingOperation, RecordingOperation};
