//! Scoped table of references
//!
//! The environment owns the references of each lexical scope and the
//! lifetime of their storage: declaring a variable reserves its cells on
//! the shared store, and leaving the scope drops the references and
//! releases the cells they own. Aliases (references with `is_reference`
//! set) never release anything.

mod frame;

pub use frame::ScopeGuard;

use std::rc::Rc;

use tracing::debug;

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::frontend;
use crate::operand::Operand;
use crate::reference::{Assign, Reference, ScopeId};
use crate::shape::Shape;
use crate::store::SharedStore;

/// Binding mode of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Writable after initialization: `int x`
    Variable,

    /// Written once, by its initialization: `const int x`
    Constant,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    start: usize,
    scope: ScopeId,
}

/// The runtime table of references, organized in scope frames.
///
/// Uses a flat binding list with frame boundaries: lookups search from the
/// most recent binding backwards, so inner declarations shadow outer ones.
///
/// # Example
///
/// ```
/// use cellbind::{BindingMode, EvalContext, Environment, MemoryStore, Slot};
///
/// let mut env = Environment::new(MemoryStore::new().shared());
/// let ctx = EvalContext::new();
///
/// env.declare("x", "int", &[], BindingMode::Variable);
/// env.assign("x", 1i64, &[], &ctx).unwrap();
///
/// env.push_frame();
/// env.declare("x", "int", &[3], BindingMode::Variable);
/// env.assign("x", vec![1i64, 2, 3], &[], &ctx).unwrap();
/// assert_eq!(env.lookup("x").unwrap().get(&[2]).unwrap(), Slot::Scalar(3));
/// env.pop_frame();
///
/// assert_eq!(env.lookup("x").unwrap().get(&[]).unwrap(), Slot::Scalar(1));
/// ```
#[derive(Debug)]
pub struct Environment {
    /// All bindings in a flat array (most recent at end)
    bindings: Vec<Reference>,

    /// Frame boundaries and the scope each frame stands for
    frames: Vec<Frame>,

    /// Next scope id to hand out
    next_scope: usize,

    store: SharedStore,
}

impl Environment {
    /// Create an environment over `store`, with the global scope open.
    pub fn new(store: SharedStore) -> Self {
        Self {
            bindings: Vec::new(),
            frames: vec![Frame {
                start: 0,
                scope: ScopeId(0),
            }],
            next_scope: 1,
            store,
        }
    }

    /// The store every reference of this environment shares.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management (Scope Entry/Exit)
    // ═══════════════════════════════════════════════════════════════════

    /// Enter a new scope (push a frame) and return its id.
    pub fn push_frame(&mut self) -> ScopeId {
        let scope = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.frames.push(Frame {
            start: self.bindings.len(),
            scope,
        });
        scope
    }

    /// Exit the current scope (pop a frame).
    ///
    /// Drops every reference declared since the matching `push_frame()` and
    /// releases the storage owned by them. Does nothing at global scope.
    pub fn pop_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(frame) = self.frames.pop() {
            let dropped: Vec<Reference> = self.bindings.drain(frame.start..).collect();
            debug!(scope = %frame.scope, count = dropped.len(), "leaving scope");
            let mut store = self.store.borrow_mut();
            for reference in dropped.iter().filter(|r| !r.is_reference()) {
                store.release(reference.locator(), reference.size());
            }
        }
    }

    /// Get the current scope depth (number of frames).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if we're at global scope.
    pub fn is_global_scope(&self) -> bool {
        self.frames.len() == 1
    }

    /// Id of the innermost scope.
    pub fn current_scope(&self) -> ScopeId {
        self.frames.last().map_or(ScopeId(0), |frame| frame.scope)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Declaration
    // ═══════════════════════════════════════════════════════════════════

    /// Declare a variable in the current scope.
    ///
    /// Empty `lengths` declare a scalar; otherwise an array of that shape.
    /// Storage for every cell is reserved on the shared store.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        lengths: &[usize],
        mode: BindingMode,
    ) -> &mut Reference {
        let (shape, size) = Shape::for_lengths(lengths);
        let locator = self.store.borrow_mut().reserve(size);
        let mut reference = Reference::new(name, type_name, false, locator, Rc::clone(&self.store))
            .with_const(mode == BindingMode::Constant);
        if let Some(shape) = shape {
            reference = reference.with_shape(shape);
        }
        debug!(name = reference.name(), %locator, size, "declared");
        self.bind(reference)
    }

    /// Bind an existing reference (typically an alias) in the current scope.
    pub fn bind(&mut self, reference: Reference) -> &mut Reference {
        let reference = reference.in_scope(self.current_scope());
        let index = self.bindings.len();
        self.bindings.push(reference);
        &mut self.bindings[index]
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Look up a reference by name, innermost first.
    pub fn get(&self, name: &str) -> Option<&Reference> {
        self.bindings.iter().rev().find(|r| r.name() == name)
    }

    /// Look up a mutable reference by name, innermost first.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Reference> {
        self.bindings.iter_mut().rev().find(|r| r.name() == name)
    }

    /// Look up a reference, failing with `UndefinedReference`.
    pub fn lookup(&self, name: &str) -> Result<&Reference> {
        self.get(name).ok_or_else(|| EvalError::UndefinedReference {
            name: name.to_string(),
        })
    }

    /// Look up a mutable reference, failing with `UndefinedReference`.
    pub fn lookup_mut(&mut self, name: &str) -> Result<&mut Reference> {
        self.get_mut(name).ok_or_else(|| EvalError::UndefinedReference {
            name: name.to_string(),
        })
    }

    /// Check if a binding exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|r| r.name() == name)
    }

    /// Check if a binding exists in the current (innermost) scope only.
    pub fn contains_in_current_scope(&self, name: &str) -> bool {
        self.current_frame_bindings().iter().any(|r| r.name() == name)
    }

    /// Get all binding names in the current scope.
    pub fn names_in_current_scope(&self) -> Vec<&str> {
        self.current_frame_bindings()
            .iter()
            .map(Reference::name)
            .collect()
    }

    /// Iterate over all references, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.bindings.iter()
    }

    /// Get the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn current_frame_bindings(&self) -> &[Reference] {
        let start = self.frames.last().map_or(0, |frame| frame.start);
        &self.bindings[start..]
    }

    // ═══════════════════════════════════════════════════════════════════
    // Access
    // ═══════════════════════════════════════════════════════════════════

    /// Write through a named reference.
    ///
    /// Errors carry the context's source location.
    pub fn assign(
        &mut self,
        name: &str,
        value: impl Into<Assign>,
        indexes: &[i64],
        ctx: &EvalContext,
    ) -> Result<()> {
        self.lookup_mut(name)
            .and_then(|reference| reference.set(value, indexes, ctx))
            .map_err(|err| err.at(ctx.location.as_ref()))
    }

    /// Initializing write through a named reference.
    ///
    /// Errors carry the context's source location.
    pub fn init(
        &mut self,
        name: &str,
        value: impl Into<Assign>,
        indexes: &[i64],
        ctx: &EvalContext,
    ) -> Result<()> {
        self.lookup_mut(name)
            .and_then(|reference| reference.init(value, indexes, ctx))
            .map_err(|err| err.at(ctx.location.as_ref()))
    }

    /// Evaluate an index expression such as `A[i][1..3]`.
    ///
    /// The base must name a reference in scope; the result is labelled with
    /// that name. Errors carry the context's source location.
    pub fn eval_index(&self, index: &syn::ExprIndex, ctx: &EvalContext) -> Result<Operand> {
        let (name, indexes) = frontend::lower_index(index)?;
        self.read(&name, &indexes, ctx)
    }

    /// Parse and evaluate an access: a bare name or an index expression.
    pub fn eval_access(&self, source: &str, ctx: &EvalContext) -> Result<Operand> {
        match frontend::parse_expr(source)? {
            syn::Expr::Index(index) => self.eval_index(&index, ctx),
            syn::Expr::Path(path) => {
                let name = frontend::path_name(&path)?;
                self.read(&name, &[], ctx)
            }
            other => Err(frontend::unsupported(&other)),
        }
    }

    fn read(&self, name: &str, indexes: &[Operand], ctx: &EvalContext) -> Result<Operand> {
        let ctx = ctx.clone().with_label(name);
        self.lookup(name)
            .and_then(|reference| reference.get_item(indexes, &ctx))
            .map_err(|err| err.at(ctx.location.as_ref()))
    }
}
