//! RAII scope guard for automatic frame cleanup

use super::Environment;

/// RAII guard that pops its frame, releasing the frame's storage, when
/// dropped.
///
/// # Example
///
/// ```
/// use cellbind::{BindingMode, Environment, MemoryStore};
///
/// let mut env = Environment::new(MemoryStore::new().shared());
/// env.declare("x", "int", &[], BindingMode::Variable);
///
/// {
///     let mut guard = env.scope_guard();
///     guard.declare("A", "int", &[4], BindingMode::Variable);
///     // A is visible here
/// }
/// // guard dropped, frame popped, A and its cells are gone
/// assert!(!env.contains("A"));
/// assert!(env.contains("x"));
/// ```
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
}

impl Environment {
    /// Create a scope guard that pushes a frame now and pops it on drop.
    pub fn scope_guard(&mut self) -> ScopeGuard<'_> {
        self.push_frame();
        ScopeGuard { env: self }
    }
}

impl<'a> Drop for ScopeGuard<'a> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl<'a> std::ops::Deref for ScopeGuard<'a> {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl<'a> std::ops::DerefMut for ScopeGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::BindingMode;
    use crate::store::{MemoryStore, Slot};
    use crate::EvalContext;

    fn env() -> Environment {
        Environment::new(MemoryStore::new().shared())
    }

    #[test]
    fn test_scope_guard_drops_frame() {
        let mut env = env();
        let initial_depth = env.depth();

        {
            let guard = env.scope_guard();
            assert_eq!(guard.depth(), initial_depth + 1);
        }
        assert_eq!(env.depth(), initial_depth);
    }

    #[test]
    fn test_scope_guard_isolates_references() {
        let mut env = env();
        env.declare("outer", "int", &[], BindingMode::Variable);

        {
            let mut guard = env.scope_guard();
            guard.declare("inner", "int", &[2], BindingMode::Variable);

            assert!(guard.contains("outer"));
            assert!(guard.contains("inner"));
            assert!(!guard.contains_in_current_scope("outer"));
        }

        assert!(env.contains("outer"));
        assert!(!env.contains("inner"));
    }

    #[test]
    fn test_scope_guard_writes_through() {
        let mut env = env();
        let ctx = EvalContext::new();
        env.declare("x", "int", &[], BindingMode::Variable);

        {
            let mut guard = env.scope_guard();
            guard.assign("x", 42i64, &[], &ctx).unwrap();
        }

        assert_eq!(env.lookup("x").unwrap().get(&[]).unwrap(), Slot::Scalar(42));
    }

    #[test]
    fn test_scope_guard_nested_scopes() {
        let mut env = env();
        env.declare("a", "int", &[], BindingMode::Variable);

        {
            let mut guard1 = env.scope_guard();
            guard1.declare("b", "int", &[], BindingMode::Variable);

            {
                let mut guard2 = guard1.scope_guard();
                guard2.declare("c", "int", &[], BindingMode::Variable);

                assert!(guard2.contains("a"));
                assert!(guard2.contains("b"));
                assert!(guard2.contains("c"));
            }

            assert!(guard1.contains("b"));
            assert!(!guard1.contains("c"));
        }

        assert!(env.contains("a"));
        assert!(!env.contains("b"));
        assert!(env.is_global_scope());
    }

    #[test]
    fn test_scope_guard_releases_storage() {
        let mut env = env();
        let ctx = EvalContext::new();

        {
            let mut guard = env.scope_guard();
            guard.declare("A", "int", &[3], BindingMode::Variable);
            guard.assign("A", vec![1i64, 2, 3], &[], &ctx).unwrap();
            assert_eq!(guard.store().borrow().read(guard.lookup("A").unwrap().locator()), Some(Slot::Scalar(1)));
        }

        assert_eq!(env.store().borrow().read(crate::Locator::new(0)), None);
    }
}
