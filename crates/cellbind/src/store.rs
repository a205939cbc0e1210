//! Storage backend contract and an in-memory implementation
//!
//! References never hold values themselves: every read and write goes
//! through a [`Store`] shared by all the references of one interpreter
//! instance, so a write made through one alias is visible through every
//! other binding of the same cell.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::operand::{Operand, OperandKind};

/// Opaque handle of a storage cell, or the base of a region of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(usize);

impl Locator {
    /// Wrap a raw cell address.
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw cell address.
    pub const fn raw(self) -> usize {
        self.0
    }

    /// The locator `cells` positions after this one.
    pub const fn offset(self, cells: usize) -> Self {
        Self(self.0 + cells)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A value as held by the store.
///
/// Raw numbers stay raw until they cross into the expression world, where
/// [`Slot::into_operand`] turns them into integer operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A plain number
    Scalar(i64),
    /// Any other expression value
    Wrapped(Operand),
}

impl Slot {
    /// Convert to an operand, wrapping raw numbers as integers.
    pub fn into_operand(self) -> Operand {
        match self {
            Slot::Scalar(value) => Operand::int(value),
            Slot::Wrapped(operand) => operand,
        }
    }

    /// The raw number, if this slot holds one.
    pub fn as_scalar(&self) -> Option<i64> {
        match self {
            Slot::Scalar(value) => Some(*value),
            Slot::Wrapped(_) => None,
        }
    }
}

impl From<i64> for Slot {
    fn from(value: i64) -> Self {
        Slot::Scalar(value)
    }
}

impl From<Operand> for Slot {
    fn from(operand: Operand) -> Self {
        match operand.kind() {
            OperandKind::Int(value) => Slot::Scalar(*value),
            _ => Slot::Wrapped(operand),
        }
    }
}

/// The storage backend consumed by references.
///
/// Row addressing packs several logical cells under one locator, selected
/// by a row number. Backends without it keep the default row methods and
/// report `false` from [`Store::supports_rows`].
pub trait Store: fmt::Debug {
    /// Whether row reads and writes are available.
    fn supports_rows(&self) -> bool {
        false
    }

    /// Read one cell; `None` if nothing was ever written there.
    fn read(&self, locator: Locator) -> Option<Slot>;

    /// Write one cell.
    fn write(&mut self, locator: Locator, value: Slot);

    /// Read one row of a cell.
    fn read_row(&self, _locator: Locator, _row: i64) -> Option<Slot> {
        None
    }

    /// Write one row of a cell.
    fn write_row(&mut self, locator: Locator, row: i64, _value: Slot) -> Result<()> {
        Err(EvalError::NotAnArray {
            name: format!("row {} of {}", row, locator),
        })
    }

    /// Read a cell as an expression value.
    fn read_item(&self, locator: Locator, ctx: &EvalContext) -> Result<Operand> {
        self.read(locator)
            .map(Slot::into_operand)
            .ok_or_else(|| EvalError::UninitializedRead {
                name: ctx.label.clone().unwrap_or_else(|| locator.to_string()),
                what: format!("cell {}", locator),
            })
    }

    /// Read a cell of a const binding as an expression value.
    fn read_const_item(&self, locator: Locator, ctx: &EvalContext) -> Result<Operand> {
        self.read_item(locator, ctx)
    }

    /// Reserve `size` consecutive cells and return the first one.
    fn reserve(&mut self, size: usize) -> Locator;

    /// Forget everything stored in `size` cells starting at `locator`.
    fn release(&mut self, _locator: Locator, _size: usize) {}
}

/// Shared, non-owning handle to a store.
pub type SharedStore = Rc<RefCell<dyn Store>>;

/// A store keeping every cell and row in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cells: IndexMap<Locator, Slot>,
    rows: IndexMap<(Locator, i64), Slot>,
    runtime_rows: bool,
    next: usize,
}

impl MemoryStore {
    /// Create a store without row addressing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with row addressing enabled.
    pub fn with_rows() -> Self {
        Self {
            runtime_rows: true,
            ..Self::default()
        }
    }

    /// Wrap this store in a shared handle.
    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Number of cells currently holding a value.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell holds a value.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Store for MemoryStore {
    fn supports_rows(&self) -> bool {
        self.runtime_rows
    }

    fn read(&self, locator: Locator) -> Option<Slot> {
        self.cells.get(&locator).cloned()
    }

    fn write(&mut self, locator: Locator, value: Slot) {
        self.cells.insert(locator, value);
    }

    fn read_row(&self, locator: Locator, row: i64) -> Option<Slot> {
        self.rows.get(&(locator, row)).cloned()
    }

    fn write_row(&mut self, locator: Locator, row: i64, value: Slot) -> Result<()> {
        if !self.runtime_rows {
            return Err(EvalError::NotAnArray {
                name: format!("row {} of {}", row, locator),
            });
        }
        self.rows.insert((locator, row), value);
        Ok(())
    }

    fn reserve(&mut self, size: usize) -> Locator {
        let first = Locator::new(self.next);
        self.next += size;
        first
    }

    fn release(&mut self, locator: Locator, size: usize) {
        let end = locator.offset(size);
        let inside = |cell: &Locator| *cell >= locator && *cell < end;
        self.cells.retain(|cell, _| !inside(cell));
        self.rows.retain(|(cell, _), _| !inside(cell));
    }
}
