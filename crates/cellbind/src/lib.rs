//! # Cellbind
//!
//! Reference resolution and array addressing for an array-expression
//! interpreter.
//!
//! Cellbind maps named variables and arrays onto a shared cell store. A
//! [`Reference`] turns index tuples into store locators, tracks which
//! cells have been initialized, enforces const and initialize-once rules,
//! and fans a write to a partially indexed array out over every cell of the
//! addressed region. An [`OperandList`] holds the ordered argument lists
//! of the expression language, splicing variadic operands when
//! materialized.
//!
//! ## Architecture
//!
//! - **Store**: Cells and rows behind the [`Store`] trait, shared by every
//!   reference that addresses them
//! - **Reference**: Name-to-storage binding with shape, flags and
//!   initialization state
//! - **Operand**: Values and expressions flowing through the evaluator
//! - **Environment**: Scoped table of references owning their storage
//! - **Frontend**: Lowering of Rust-syntax index expressions via `syn`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod environment;
pub mod error;
pub mod frontend;
pub mod operand;
pub mod reference;
pub mod shape;
pub mod store;

// Re-export main types
pub use context::{EvalContext, SourceLocation};
pub use environment::{BindingMode, Environment, ScopeGuard};
pub use error::{EvalError, Result};
pub use operand::{ArrayView, BinaryOp, Operand, OperandKind, OperandList, RangeIndex};
pub use reference::{Address, Assign, RefFlags, Reference, ScopeId, PLACEHOLDER_LABEL};
pub use shape::{RowMajor, Shape};
pub use store::{Locator, MemoryStore, SharedStore, Slot, Store};

/// Cellbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
