//! Environment tests

use cellbind::*;
use pretty_assertions::assert_eq;

fn env() -> Environment {
    Environment::new(MemoryStore::new().shared())
}

fn location() -> SourceLocation {
    SourceLocation::new("main.arr", 4, 9)
}

// ═══════════════════════════════════════════════════════════════════════
// Basic Operations
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_environment_new_is_empty() {
    let env = env();
    assert!(env.is_empty());
    assert_eq!(env.len(), 0);
    assert_eq!(env.depth(), 1); // Global frame
}

#[test]
fn test_declare_reserves_storage() {
    let mut env = env();
    env.declare("x", "int", &[], BindingMode::Variable);
    env.declare("A", "int", &[2, 3], BindingMode::Variable);

    let x = env.lookup("x").unwrap();
    let a = env.lookup("A").unwrap();
    assert!(x.shape().is_none());
    assert_eq!(a.shape().map(Shape::lengths), Some(&[2, 3][..]));
    assert_eq!(a.locator(), x.locator().offset(1));
    assert_eq!(env.len(), 2);
}

#[test]
fn test_declare_constant() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("k", "int", &[], BindingMode::Constant);

    env.assign("k", 1i64, &[], &ctx).unwrap();
    assert!(matches!(
        env.assign("k", 2i64, &[], &ctx),
        Err(EvalError::ConstViolation { .. })
    ));
}

#[test]
fn test_shadowing() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("x", "int", &[], BindingMode::Variable);
    env.assign("x", 1i64, &[], &ctx).unwrap();

    env.push_frame();
    env.declare("x", "int", &[], BindingMode::Variable);
    env.assign("x", 2i64, &[], &ctx).unwrap();
    assert_eq!(env.lookup("x").unwrap().get(&[]).unwrap(), Slot::Scalar(2));
    env.pop_frame();

    assert_eq!(env.lookup("x").unwrap().get(&[]).unwrap(), Slot::Scalar(1));
}

#[test]
fn test_alias_does_not_release_storage() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("A", "int", &[3], BindingMode::Variable);
    env.assign("A", vec![1i64, 2, 3], &[], &ctx).unwrap();

    {
        let mut guard = env.scope_guard();
        let target = guard.lookup("A").unwrap();
        let alias = Reference::new(
            "B",
            target.type_name(),
            true,
            target.locator(),
            target.store().clone(),
        )
        .with_shape(Shape::new(vec![3]));
        guard.bind(alias);
        assert_eq!(guard.eval_access("B[1]", &ctx).unwrap(), Operand::int(2));
    }

    // popping the alias does not release the aliased cells
    assert_eq!(env.eval_access("A[1]", &ctx).unwrap(), Operand::int(2));
}

// ═══════════════════════════════════════════════════════════════════════
// Access by source
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_eval_access_labels_result() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("A", "int", &[2, 2], BindingMode::Variable);
    env.assign("A", vec![1i64, 2, 3, 4], &[], &ctx).unwrap();

    let value = env.eval_access("A[1][0]", &ctx).unwrap();
    assert_eq!(value, Operand::int(3));
    assert_eq!(value.label(), Some("A[1][0]"));

    let value = env.eval_access("A[(0 + 1)][2 - 1]", &ctx).unwrap();
    assert_eq!(value, Operand::int(4));
}

#[test]
fn test_eval_access_bare_name() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("x", "int", &[], BindingMode::Variable);
    env.assign("x", 9i64, &[], &ctx).unwrap();

    let value = env.eval_access("x", &ctx).unwrap();
    assert_eq!(value, Operand::int(9));
    assert_eq!(value.label(), Some("x"));
}

#[test]
fn test_eval_access_slice() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("A", "int", &[4], BindingMode::Variable);
    env.assign("A", vec![5i64, 6, 7, 8], &[], &ctx).unwrap();

    let slice = env.eval_access("A[1..=2]", &ctx).unwrap();
    assert_eq!(slice.to_string(), "int[2]@1");
    let OperandKind::Array(view) = slice.kind() else {
        panic!("expected an array view, got {}", slice);
    };
    assert_eq!(view.elements().unwrap(), vec![Operand::int(6), Operand::int(7)]);
}

#[test]
fn test_eval_access_undefined() {
    let env = env();
    let err = env.eval_access("nope[0]", &EvalContext::new()).unwrap_err();
    assert!(matches!(err, EvalError::UndefinedReference { .. }));
}

#[test]
fn test_eval_access_unsupported() {
    let env = env();
    let err = env.eval_access("f(1)", &EvalContext::new()).unwrap_err();
    assert!(matches!(err, EvalError::UnsupportedExpr { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
// Source locations
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_errors_carry_location() {
    let mut env = env();
    let ctx = EvalContext::new().with_location(location());
    env.declare("x", "int", &[], BindingMode::Variable);

    let err = env.eval_access("x", &ctx).unwrap_err();
    assert_eq!(err.to_string(), "cell @0 of x isn't initialized at main.arr:4:9");
    assert!(matches!(err.root(), EvalError::UninitializedRead { .. }));
}

#[test]
fn test_errors_without_location_are_bare() {
    let mut env = env();
    let ctx = EvalContext::new();
    env.declare("x", "int", &[], BindingMode::Constant);
    env.init("x", 1i64, &[], &ctx).unwrap();

    let err = env.init("x", 2i64, &[], &ctx).unwrap_err();
    assert!(matches!(err, EvalError::DoubleInitialization { .. }));
}
