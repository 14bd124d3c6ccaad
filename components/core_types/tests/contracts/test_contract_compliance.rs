//! Contract compliance tests for core_types
//!
//! These tests verify the public surface other components build against.

use core_types::{ErrorKind, RuntimeError, Value};

#[cfg(test)]
mod value_contract_tests {
    use super::*;

    /// Contract: Value enum must have all specified variants
    #[test]
    fn test_value_has_primitive_variants() {
        let _: Value = Value::Undefined;
        let _: Value = Value::Null;
        let _: Value = Value::Boolean(true);
        let _: Value = Value::Smi(i32::MIN);
        let _: Value = Value::Double(f64::INFINITY);
        let _: Value = Value::String(String::new());
    }

    #[test]
    fn test_value_has_list_variant() {
        let _: Value = Value::List(vec![Value::Undefined]);
    }

    #[test]
    fn test_value_is_clone_and_partial_eq() {
        let val = Value::List(vec![Value::Smi(1)]);
        let copy = val.clone();
        assert_eq!(val, copy);
    }

    #[test]
    fn test_value_helpers_exist() {
        let val = Value::Smi(1);
        let _: bool = val.is_truthy();
        let _: bool = val.is_undefined();
        let _: &'static str = val.type_of();
        let _: Option<&[Value]> = val.as_list();
    }
}

#[cfg(test)]
mod error_contract_tests {
    use super::*;

    /// Contract: ErrorKind must expose every documented variant
    #[test]
    fn test_error_kind_variants() {
        let _: ErrorKind = ErrorKind::Generic;
        let _: ErrorKind = ErrorKind::Type;
        let _: ErrorKind = ErrorKind::Range;
        let _: ErrorKind = ErrorKind::Aggregate;
        let _: ErrorKind = ErrorKind::Internal;
    }

    #[test]
    fn test_error_fields() {
        let error = RuntimeError::new(ErrorKind::Generic, "msg");
        let _: &ErrorKind = &error.kind;
        let _: &String = &error.message;
        let _: &Vec<RuntimeError> = &error.causes;
    }

    #[test]
    fn test_error_constructors() {
        let _: RuntimeError = RuntimeError::new(ErrorKind::Type, "t");
        let _: RuntimeError = RuntimeError::generic("g");
        let _: RuntimeError = RuntimeError::aggregate(vec![]);
    }

    #[test]
    fn test_error_implements_display_and_error() {
        let error = RuntimeError::generic("display");
        let _: String = error.to_string();
        let _: &dyn std::error::Error = &error;
    }
}
