//! Validation helpers for pipeline definitions.

use crate::errors::ConfigurationError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Pattern every stage name must match.
pub const STAGE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.\-]*$";

#[allow(clippy::expect_used)]
fn stage_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STAGE_NAME_PATTERN).expect("stage name pattern is valid"))
}

/// Returns true if `name` is a valid stage name.
#[must_use]
pub fn is_valid_stage_name(name: &str) -> bool {
    stage_name_regex().is_match(name)
}

/// Validates a stage name.
///
/// # Errors
///
/// Returns a `STAGE-NAME-INVALID` configuration error for empty names or
/// names that are not identifiers.
pub fn validate_stage_name(name: &str) -> Result<(), ConfigurationError> {
    if is_valid_stage_name(name) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_stage_name(name))
    }
}

/// Validates that no two names in `names` are equal.
///
/// # Errors
///
/// Returns a `STAGE-NAME-DUPLICATE` configuration error naming the first
/// repeated name.
pub fn validate_unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigurationError::duplicate_stage(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;

    #[test]
    fn test_valid_stage_names() {
        for name in ["load", "to_gray", "canny-edges", "_tmp", "blur.v2", "s1"] {
            assert!(is_valid_stage_name(name), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_stage_names() {
        for name in ["", "   ", "1st", "has space", "slash/name"] {
            let err = validate_stage_name(name).unwrap_err();
            assert_eq!(err.code(), codes::STAGE_NAME_INVALID);
        }
    }

    #[test]
    fn test_unique_names() {
        assert!(validate_unique_names(["a", "b", "c"]).is_ok());
        let err = validate_unique_names(["a", "b", "a"]).unwrap_err();
        assert_eq!(err.code(), codes::STAGE_NAME_DUPLICATE);
        assert_eq!(err.stages, vec!["a".to_string()]);
    }
}
