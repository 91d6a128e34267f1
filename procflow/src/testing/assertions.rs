//! Test assertions for slots, parameters and errors.

use crate::core::{SlotRef, Value};
use crate::errors::PipelineError;
use crate::params::Parameter;

/// Asserts that the slot behind `slot_ref` holds `expected`.
pub fn assert_slot_value(slot_ref: &SlotRef, expected: &Value) {
    let actual = slot_ref.get();
    assert_eq!(
        &actual, expected,
        "Expected {slot_ref} to hold {expected}, got {actual}"
    );
}

/// Asserts that resolving `param` yields `expected`.
pub fn assert_resolves_to(param: &mut Parameter, expected: &Value) {
    let actual = param.resolve();
    assert_eq!(
        &actual, expected,
        "Expected parameter {:?} to resolve to {expected}, got {actual}",
        param.name()
    );
}

/// Asserts that `result` failed with a configuration error carrying `code`.
pub fn assert_config_error<T: std::fmt::Debug>(result: &Result<T, PipelineError>, code: &str) {
    match result {
        Err(err) => {
            assert!(
                err.is_configuration(),
                "Expected a configuration error, got: {err}"
            );
            assert_eq!(err.code(), Some(code), "Unexpected error code for: {err}");
        }
        Ok(value) => panic!("Expected configuration error {code}, got Ok({value:?})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValueSlot;
    use crate::errors::{codes, ConfigurationError};

    #[test]
    fn test_assert_slot_value() {
        let slot_ref = SlotRef::new("load", 0, ValueSlot::with_value(3_i64));
        assert_slot_value(&slot_ref, &Value::Int(3));
    }

    #[test]
    #[should_panic(expected = "Expected load[0] to hold")]
    fn test_assert_slot_value_mismatch() {
        let slot_ref = SlotRef::new("load", 0, ValueSlot::new());
        assert_slot_value(&slot_ref, &Value::Int(3));
    }

    #[test]
    fn test_assert_resolves_to() {
        let mut param = Parameter::int().with_default(4_i64);
        assert_resolves_to(&mut param, &Value::Int(4));
    }

    #[test]
    fn test_assert_config_error() {
        let result: Result<(), PipelineError> =
            Err(ConfigurationError::empty_pipeline("p").into());
        assert_config_error(&result, codes::PIPELINE_EMPTY);
    }

    #[test]
    #[should_panic(expected = "Expected configuration error")]
    fn test_assert_config_error_on_ok() {
        let result: Result<u8, PipelineError> = Ok(1);
        assert_config_error(&result, codes::PIPELINE_EMPTY);
    }
}
