//! Error formatting and location tests

use std::error::Error;

use cellbind::*;
use pretty_assertions::assert_eq;

#[test]
fn test_error_messages() {
    let cases = vec![
        (
            EvalError::DoubleInitialization {
                name: "A".to_string(),
                indexes: vec![1, 2],
            },
            "value initialized: A[1][2]",
        ),
        (
            EvalError::ConstViolation {
                name: "k".to_string(),
                indexes: vec![0],
            },
            "setting k[0] a const element",
        ),
        (
            EvalError::UninitializedRead {
                name: "x".to_string(),
                what: "Row 3".to_string(),
            },
            "Row 3 of x isn't initialized",
        ),
        (
            EvalError::IndexOutOfShape {
                indexes: vec![3, 0],
                lengths: vec![3, 4],
            },
            "index [3,0] out of range for shape [3,4]",
        ),
        (
            EvalError::MisplacedRange {
                position: 0,
                count: 2,
            },
            "range index is valid only in last index (found at position 0 of 2)",
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn test_location_attached_once() {
    let first = SourceLocation::new("a.arr", 1, 2);
    let second = SourceLocation::new("b.arr", 3, 4);
    let err = EvalError::NotAnArray {
        name: "x".to_string(),
    }
    .at(Some(&first))
    .at(Some(&second));

    assert_eq!(
        err.to_string(),
        "try to access to index on non-array value x at a.arr:1:2"
    );
    assert!(err.source().is_some());
    assert!(matches!(err.root(), EvalError::NotAnArray { .. }));
}

#[test]
fn test_no_location_keeps_error() {
    let err = EvalError::UndefinedReference {
        name: "y".to_string(),
    }
    .at(None);
    assert!(matches!(err, EvalError::UndefinedReference { .. }));
    assert!(err.source().is_none());
}

#[test]
fn test_parse_errors_are_unsupported() {
    let err = frontend::parse_operand("[1,").unwrap_err();
    match err {
        EvalError::UnsupportedExpr { kind, span } => {
            assert!(kind.starts_with("Rust syntax error"));
            assert!(span.is_some());
        }
        other => panic!("expected UnsupportedExpr, got {:?}", other),
    }
}
