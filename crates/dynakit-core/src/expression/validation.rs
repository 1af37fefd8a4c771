//! Input validation shared by every expression builder.
//!
//! Builders reject bad input at the call that introduces it, so a builder that
//! holds state always holds valid state.

use std::cmp::Ordering;

use dynakit_model::AttributeValue;

use super::condition::Operator;

/// Maximum number of conditions a query or scan builder accepts.
pub const MAX_CONDITIONS: usize = 100;

/// Maximum number of field updates an update builder accepts.
pub const MAX_UPDATES: usize = 100;

/// Maximum length, in characters, of any string inside a value.
pub const MAX_STRING_LENGTH: usize = 400_000;

/// Upper bound for a page limit.
pub const MAX_LIMIT: usize = 1000;

/// Maximum number of operands in an `IN` list.
pub const MAX_IN_OPERANDS: usize = 100;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised while building an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    /// A field name contains characters outside `[A-Za-z0-9_]`.
    #[error("Invalid field name '{field}': only letters, digits and underscores are allowed")]
    InvalidFieldName {
        /// The rejected name.
        field: String,
    },
    /// A projection path has an empty or unusable segment.
    #[error("Invalid projection path '{path}'")]
    InvalidProjection {
        /// The rejected path.
        path: String,
    },
    /// A value has the wrong shape for the operation.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field or placeholder the value belongs to.
        field: String,
        /// Explanation.
        reason: String,
    },
    /// A string inside a value is too long.
    #[error("Value for '{field}' exceeds {limit} characters")]
    ValueTooLarge {
        /// Field the value belongs to.
        field: String,
        /// The limit that was exceeded.
        limit: usize,
    },
    /// More conditions than a builder accepts.
    #[error("Too many conditions: at most {limit} may be added")]
    TooManyConditions {
        /// The limit.
        limit: usize,
    },
    /// More updates than a builder accepts.
    #[error("Too many updates: at most {limit} may be added")]
    TooManyUpdates {
        /// The limit.
        limit: usize,
    },
    /// `BETWEEN` bounds are out of order or of different types.
    #[error("Invalid range for '{field}': {reason}")]
    InvalidRange {
        /// Field the range applies to.
        field: String,
        /// Explanation.
        reason: String,
    },
    /// `IN` was given an empty list.
    #[error("'{field}' requires a non-empty list")]
    EmptyList {
        /// Field the list applies to.
        field: String,
    },
    /// A query was built without any condition.
    #[error("Query requires at least one condition; no conditions were added")]
    NoConditions,
    /// An update was compiled without any operation.
    #[error("Update requires at least one operation; no updates were added")]
    NoUpdates,
    /// The same field is touched by more than one update.
    #[error("Field '{field}' is updated more than once")]
    OverlappingUpdate {
        /// The repeated field.
        field: String,
    },
    /// A page limit outside `1..=1000`.
    #[error("Invalid limit {limit}: must be between 1 and {max}")]
    InvalidLimit {
        /// The rejected limit.
        limit: usize,
        /// The maximum.
        max: usize,
    },
    /// Parallel-scan coordinates are inconsistent.
    #[error("Invalid parallel scan: segment {segment} of {total_segments}")]
    InvalidSegment {
        /// The requested segment.
        segment: u32,
        /// The requested total.
        total_segments: u32,
    },
    /// The first query condition cannot form a key condition.
    #[error("{operator} cannot be used in a key condition")]
    UnsupportedKeyCondition {
        /// The operator of the first condition.
        operator: Operator,
    },
    /// Two expressions bind one placeholder to different things.
    #[error("Placeholder {placeholder} is already bound to a different value")]
    PlaceholderConflict {
        /// The clashing placeholder.
        placeholder: String,
    },
    /// A custom expression references a value that was not supplied.
    #[error("Expression references {placeholder} but no value was supplied for it")]
    MissingValue {
        /// The unbound placeholder.
        placeholder: String,
    },
    /// A custom expression references a name placeholder that was not mapped.
    #[error("Expression references {placeholder} but no attribute name was supplied for it")]
    MissingName {
        /// The unmapped placeholder.
        placeholder: String,
    },
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Accept only `[A-Za-z0-9_]+`.
pub fn validate_field_name(field: &str) -> Result<(), ExpressionError> {
    if !field.is_empty() && field.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(ExpressionError::InvalidFieldName {
            field: field.to_owned(),
        })
    }
}

/// Accept a dotted document path whose segments can be addressed by name.
///
/// Segments may contain characters that need escaping (hyphens, spaces), but
/// not the sigils and punctuation of the expression grammar itself.
pub fn validate_projection_path(path: &str) -> Result<(), ExpressionError> {
    let usable = |segment: &str| {
        !segment.trim().is_empty()
            && !segment.chars().any(|c| {
                matches!(c, '#' | ':' | ',' | '(' | ')' | '=' | '<' | '>') || c.is_control()
            })
    };
    if path.split('.').all(usable) {
        Ok(())
    } else {
        Err(ExpressionError::InvalidProjection {
            path: path.to_owned(),
        })
    }
}

/// Reject nulls and oversized strings.
pub fn validate_value(field: &str, value: &AttributeValue) -> Result<(), ExpressionError> {
    if matches!(value, AttributeValue::Null(_)) {
        return Err(invalid_value(field, "value must not be null"));
    }
    if value.longest_string() > MAX_STRING_LENGTH {
        return Err(ExpressionError::ValueTooLarge {
            field: field.to_owned(),
            limit: MAX_STRING_LENGTH,
        });
    }
    Ok(())
}

/// Require a finite number.
pub fn validate_number(field: &str, value: &AttributeValue) -> Result<f64, ExpressionError> {
    value
        .as_finite_number()
        .ok_or_else(|| invalid_value(field, "expected a finite number"))
}

/// Require a string.
pub fn validate_string<'v>(
    field: &str,
    value: &'v AttributeValue,
) -> Result<&'v str, ExpressionError> {
    validate_value(field, value)?;
    value
        .as_s()
        .ok_or_else(|| invalid_value(field, "expected a string"))
}

/// Require a string, number or binary set.
pub fn validate_set(field: &str, value: &AttributeValue) -> Result<(), ExpressionError> {
    validate_value(field, value)?;
    if value.is_set() {
        Ok(())
    } else {
        Err(invalid_value(field, "expected a set"))
    }
}

/// Both bounds valid, of one comparable type, and `start <= end`.
pub fn validate_range(
    field: &str,
    start: &AttributeValue,
    end: &AttributeValue,
) -> Result<(), ExpressionError> {
    validate_value(field, start)?;
    validate_value(field, end)?;

    let ordering = match (start, end) {
        (AttributeValue::N(_), AttributeValue::N(_)) => {
            let a = validate_number(field, start)?;
            let b = validate_number(field, end)?;
            a.partial_cmp(&b)
        }
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ExpressionError::InvalidRange {
                field: field.to_owned(),
                reason: format!(
                    "bounds must share one of the types S, N or B, got {} and {}",
                    start.type_descriptor(),
                    end.type_descriptor()
                ),
            });
        }
    };

    if ordering == Some(Ordering::Greater) {
        return Err(ExpressionError::InvalidRange {
            field: field.to_owned(),
            reason: "start must not be greater than end".to_owned(),
        });
    }
    Ok(())
}

/// Page limits are `1..=1000`.
pub fn validate_limit(limit: usize) -> Result<(), ExpressionError> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(ExpressionError::InvalidLimit {
            limit,
            max: MAX_LIMIT,
        })
    }
}

pub(crate) fn invalid_value(field: &str, reason: &str) -> ExpressionError {
    ExpressionError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_plain_field_names() {
        for name in ["userId", "created_at", "A1", "_"] {
            assert!(validate_field_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_should_reject_field_names_outside_charset() {
        for name in ["", "user-id", "a b", "a.b", "#x", ":y", "naïve"] {
            assert!(
                matches!(
                    validate_field_name(name),
                    Err(ExpressionError::InvalidFieldName { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_should_accept_escapable_projection_paths() {
        assert!(validate_projection_path("info.first-name").is_ok());
        assert!(validate_projection_path("display name").is_ok());
        assert!(validate_projection_path("tags[0]").is_ok());
        assert!(validate_projection_path("a..b").is_err());
        assert!(validate_projection_path("a,b").is_err());
        assert!(validate_projection_path("").is_err());
    }

    #[test]
    fn test_should_reject_null_and_oversized_values() {
        assert!(validate_value("f", &AttributeValue::Null(true)).is_err());
        assert!(validate_value("f", &AttributeValue::Null(false)).is_err());
        let big = AttributeValue::S("x".repeat(MAX_STRING_LENGTH + 1));
        assert_eq!(
            validate_value("f", &big),
            Err(ExpressionError::ValueTooLarge {
                field: "f".to_owned(),
                limit: MAX_STRING_LENGTH
            })
        );
        let exact = AttributeValue::S("x".repeat(MAX_STRING_LENGTH));
        assert!(validate_value("f", &exact).is_ok());
    }

    #[test]
    fn test_should_find_oversized_strings_inside_documents() {
        let nested = AttributeValue::L(vec![AttributeValue::S("y".repeat(MAX_STRING_LENGTH + 1))]);
        assert!(matches!(
            validate_value("f", &nested),
            Err(ExpressionError::ValueTooLarge { .. })
        ));
    }

    #[test]
    fn test_should_validate_ranges() {
        assert!(validate_range("age", &18.into(), &65.into()).is_ok());
        assert!(validate_range("age", &18.into(), &18.into()).is_ok());
        assert!(matches!(
            validate_range("age", &65.into(), &18.into()),
            Err(ExpressionError::InvalidRange { .. })
        ));
        assert!(validate_range("sk", &"a".into(), &"b".into()).is_ok());
        assert!(validate_range("sk", &"b".into(), &"a".into()).is_err());
        assert!(validate_range("sk", &"a".into(), &1.into()).is_err());
    }

    #[test]
    fn test_should_validate_limits() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(1000).is_ok());
        assert_eq!(
            validate_limit(0),
            Err(ExpressionError::InvalidLimit { limit: 0, max: 1000 })
        );
        assert!(validate_limit(1001).is_err());
    }

    #[test]
    fn test_should_require_sets() {
        assert!(validate_set("tags", &AttributeValue::Ss(vec!["a".to_owned()])).is_ok());
        assert!(validate_set("tags", &AttributeValue::from("a")).is_err());
    }
}
