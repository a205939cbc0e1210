//! References: name-to-storage bindings
//!
//! A [`Reference`] binds a variable or array name to a base locator in a
//! shared [`Store`], plus an optional [`Shape`]. It never caches values:
//! every read and write is resolved to an [`Address`] and routed through the
//! store, so writes made through another binding of the same cells are
//! always visible. The reference owns the initialization state (the scalar
//! flag, the shape's per-cell bitset, or the set of written rows) and
//! enforces the const and initialize-once rules.

use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::operand::{ArrayView, Operand};
use crate::shape::{RowMajor, Shape};
use crate::store::{Locator, SharedStore, Slot, Store};

/// Label given to read results when the caller supplies none.
pub const PLACEHOLDER_LABEL: &str = "___";

/// Property names a named flag may never take.
const RESERVED_PROPERTIES: &[&str] = &[
    "name",
    "type",
    "is_reference",
    "array",
    "shape",
    "locator",
    "scope_id",
    "store",
    "instance",
    "initialized",
    "const",
];

/// Identifier of the lexical scope owning a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Flags attached to a reference at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefFlags {
    /// The cells may be written once, by their initializing write
    pub is_const: bool,

    extra: IndexMap<String, bool>,
}

impl RefFlags {
    /// Flags of a const binding.
    pub fn constant() -> Self {
        Self {
            is_const: true,
            ..Self::default()
        }
    }

    /// Look up a flag by name; `const` is always present.
    pub fn get(&self, name: &str) -> Option<bool> {
        if name == "const" {
            return Some(self.is_const);
        }
        self.extra.get(name).copied()
    }

    /// Names of the extension flags, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }
}

/// Where a single access lands in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// The one cell of a scalar binding
    Scalar(Locator),
    /// A cell (or region base) of an array binding
    Indexed(Locator),
    /// A row packed under a cell
    Row {
        /// The cell holding the rows
        locator: Locator,
        /// The selected row
        row: i64,
    },
}

impl Address {
    /// The cell this address points into.
    pub fn locator(&self) -> Locator {
        match *self {
            Address::Scalar(locator) | Address::Indexed(locator) => locator,
            Address::Row { locator, .. } => locator,
        }
    }
}

/// The right-hand side of a write.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// One value, for a write that addresses a single cell
    Item(Slot),
    /// A plain sequence, consumed in row-major order
    Seq(Vec<Slot>),
    /// An indexable operand, read with each cell's relative indexes
    Indexed(Operand),
}

impl Assign {
    fn into_single(self, name: &str) -> Result<Slot> {
        match self {
            Assign::Item(slot) => Ok(slot),
            Assign::Indexed(operand) => Ok(Slot::from(operand)),
            Assign::Seq(items) => Err(EvalError::type_error(format!(
                "cannot assign a sequence of {} values to a single cell of {}",
                items.len(),
                name
            ))),
        }
    }
}

impl From<Slot> for Assign {
    fn from(slot: Slot) -> Self {
        Assign::Item(slot)
    }
}

impl From<i64> for Assign {
    fn from(value: i64) -> Self {
        Assign::Item(Slot::Scalar(value))
    }
}

impl From<Vec<Slot>> for Assign {
    fn from(items: Vec<Slot>) -> Self {
        Assign::Seq(items)
    }
}

impl From<Vec<i64>> for Assign {
    fn from(items: Vec<i64>) -> Self {
        Assign::Seq(items.into_iter().map(Slot::Scalar).collect())
    }
}

impl From<Operand> for Assign {
    fn from(operand: Operand) -> Self {
        Assign::Indexed(operand)
    }
}

/// A binding of a name to storage.
pub struct Reference {
    name: String,
    type_name: String,
    is_reference: bool,
    shape: Option<Shape>,
    locator: Locator,
    scope_id: ScopeId,
    store: SharedStore,
    initialized: bool,
    rows: IndexSet<(Locator, i64)>,
    flags: RefFlags,
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("is_reference", &self.is_reference)
            .field("lengths", &self.shape.as_ref().map(Shape::lengths))
            .field("locator", &self.locator)
            .field("scope_id", &self.scope_id)
            .field("initialized", &self.initialized)
            .field("rows", &self.rows.len())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Reference {
    /// Create a scalar binding of `locator` in `store`.
    ///
    /// `is_reference` tells whether the binding aliases storage owned by
    /// another binding rather than owning it.
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        is_reference: bool,
        locator: Locator,
        store: SharedStore,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_reference,
            shape: None,
            locator,
            scope_id: ScopeId::default(),
            store,
            initialized: false,
            rows: IndexSet::new(),
            flags: RefFlags::default(),
        }
    }

    /// Make this an array binding (builder pattern)
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Set the owning scope (builder pattern)
    pub fn in_scope(mut self, scope_id: ScopeId) -> Self {
        self.scope_id = scope_id;
        self
    }

    /// Mark the binding const (builder pattern)
    pub fn with_const(mut self, is_const: bool) -> Self {
        self.flags.is_const = is_const;
        self
    }

    /// Attach a named flag.
    ///
    /// # Errors
    ///
    /// Returns `PropertyCollision` if the name is one of the reference's own
    /// properties or was already attached.
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Result<Self> {
        let name = name.into();
        if RESERVED_PROPERTIES.contains(&name.as_str()) || self.flags.extra.contains_key(&name) {
            return Err(EvalError::PropertyCollision {
                name,
                reference: self.name,
            });
        }
        self.flags.extra.insert(name, value);
        Ok(self)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// Display name of the binding
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag of the bound entity
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this binding aliases another binding's storage
    pub fn is_reference(&self) -> bool {
        self.is_reference
    }

    /// Shape of an array binding, `None` for scalars
    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    /// Base locator of the binding
    pub fn locator(&self) -> Locator {
        self.locator
    }

    /// Scope owning the binding
    pub fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    /// Flags of the binding
    pub fn flags(&self) -> &RefFlags {
        &self.flags
    }

    /// Whether the binding is const
    pub fn is_const(&self) -> bool {
        self.flags.is_const
    }

    /// Number of store cells the binding spans
    pub fn size(&self) -> usize {
        self.shape.as_ref().map_or(1, Shape::size)
    }

    /// The shared store the binding reads and writes
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════════════
    // Addressing
    // ═══════════════════════════════════════════════════════════════════

    /// Whether `indexes` is an acceptable index tuple for this binding.
    pub fn is_valid_indexes(&self, indexes: &[i64]) -> bool {
        if indexes.is_empty() {
            return true;
        }
        match &self.shape {
            Some(shape) => shape.is_valid_indexes(indexes),
            None => false,
        }
    }

    /// Locator of the cell (or region base) addressed by `indexes`.
    ///
    /// # Errors
    ///
    /// Returns `NotAnArray` for indexes on a scalar binding and
    /// `IndexOutOfShape` for indexes the shape rejects.
    pub fn id(&self, indexes: &[i64]) -> Result<Locator> {
        trace!(name = %self.name, ?indexes, "resolving locator");
        match &self.shape {
            Some(shape) => shape.locator(self.locator, indexes),
            None if indexes.is_empty() => Ok(self.locator),
            None => Err(self.not_an_array()),
        }
    }

    /// Resolve `indexes` to a cell or a row address.
    ///
    /// Rows apply only when the store supports them and indexes are given:
    /// a scalar binding selects a row with its single index, and an array
    /// of dimension D selects a row of a cell with D+1 indexes (the last
    /// one being the row). Anything else is ordinary cell addressing.
    pub fn address(&self, indexes: &[i64]) -> Result<Address> {
        let rows = self.store.borrow().supports_rows();
        if !rows || indexes.is_empty() {
            let locator = self.id(indexes)?;
            return Ok(match self.shape {
                Some(_) => Address::Indexed(locator),
                None => Address::Scalar(locator),
            });
        }
        match &self.shape {
            None if indexes.len() == 1 => Ok(Address::Row {
                locator: self.id(&[])?,
                row: indexes[0],
            }),
            None => Err(self.not_an_array()),
            Some(shape) if indexes.len() == shape.dim() + 1 => {
                let (column, row) = indexes.split_at(shape.dim());
                Ok(Address::Row {
                    locator: self.id(column)?,
                    row: row[0],
                })
            }
            Some(_) => Ok(Address::Indexed(self.id(indexes)?)),
        }
    }

    /// The row a row-addressed access selects, keyed by its cell.
    fn row_key(&self, indexes: &[i64]) -> Option<(Locator, i64)> {
        match self.address(indexes) {
            Ok(Address::Row { locator, row }) => Some((locator, row)),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Initialization state
    // ═══════════════════════════════════════════════════════════════════

    /// Record the initializing write of a cell.
    ///
    /// # Errors
    ///
    /// Returns `DoubleInitialization` if the cell, or the row, was already
    /// initialized.
    pub fn mark_as_initialized(&mut self, indexes: &[i64]) -> Result<()> {
        if let Some(key) = self.row_key(indexes) {
            if !self.rows.insert(key) {
                return Err(EvalError::DoubleInitialization {
                    name: self.name.clone(),
                    indexes: indexes.to_vec(),
                });
            }
            return Ok(());
        }
        match &mut self.shape {
            Some(shape) if !indexes.is_empty() => shape.mark_as_initialized(indexes),
            _ => {
                if self.initialized {
                    return Err(EvalError::DoubleInitialization {
                        name: self.name.clone(),
                        indexes: Vec::new(),
                    });
                }
                self.initialized = true;
                Ok(())
            }
        }
    }

    /// Whether the addressed cell has been initialized.
    pub fn is_initialized(&self, indexes: &[i64]) -> bool {
        if let Some(key) = self.row_key(indexes) {
            return self.rows.contains(&key);
        }
        match &self.shape {
            Some(shape) if !indexes.is_empty() => shape.is_initialized(indexes),
            _ => self.initialized,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════

    /// Read the raw value at `indexes`.
    ///
    /// # Errors
    ///
    /// Returns `UninitializedRead` if nothing was written there.
    pub fn get(&self, indexes: &[i64]) -> Result<Slot> {
        let address = self.address(indexes)?;
        let store = self.store.borrow();
        match address {
            Address::Row { locator, row } => store
                .read_row(locator, row)
                .ok_or_else(|| self.uninitialized(format!("row {}", row))),
            Address::Scalar(locator) | Address::Indexed(locator) => store
                .read(locator)
                .ok_or_else(|| self.uninitialized(format!("cell {}", suffix(indexes)))),
        }
    }

    /// Indexed read as performed by the evaluator.
    ///
    /// Indexes are evaluated to integers; the last one may be a range. A
    /// tuple addressing one cell reads it, a partial tuple or a trailing
    /// range yields an array view over the addressed region, and a single
    /// index on a scalar binding reads a row when the store has rows. The
    /// result is labelled `label[i][j]` from `ctx.label`, or with
    /// [`PLACEHOLDER_LABEL`].
    ///
    /// # Errors
    ///
    /// Returns `MisplacedRange` for a range before the last index,
    /// `NotAnArray` for indexes on a scalar without rows and
    /// `UninitializedRead` for unwritten rows or cells.
    pub fn get_item(&self, indexes: &[Operand], ctx: &EvalContext) -> Result<Operand> {
        trace!(name = %self.name, count = indexes.len(), "indexed read");
        let mut evaluated = Vec::with_capacity(indexes.len());
        let mut range = None;
        for (position, index) in indexes.iter().enumerate() {
            if let Some(bounds) = index.as_range() {
                if position + 1 != indexes.len() {
                    return Err(EvalError::MisplacedRange {
                        position,
                        count: indexes.len(),
                    });
                }
                range = Some(bounds.bounds()?);
                continue;
            }
            evaluated.push(index.as_int()?);
        }

        let label = match &ctx.label {
            Some(label) if !indexes.is_empty() => format!("{}{}", label, suffix(&evaluated)),
            Some(label) => label.clone(),
            None => PLACEHOLDER_LABEL.to_string(),
        };

        let store = self.store.borrow();
        let mut value = match &self.shape {
            Some(shape) if range.is_none() && shape.is_fully_indexed(&evaluated) => {
                let locator = shape.locator(self.locator, &evaluated)?;
                self.read_cell(&*store, locator, ctx)?
            }
            Some(shape)
                if range.is_none()
                    && store.supports_rows()
                    && evaluated.len() == shape.dim() + 1 =>
            {
                let (column, row) = evaluated.split_at(shape.dim());
                let locator = shape.locator(self.locator, column)?;
                self.read_row(&*store, locator, row[0], &label)?
            }
            Some(shape) => {
                let (from, to) = range.unwrap_or((None, None));
                let (sub, base) = shape.sub_shape(&evaluated, self.locator, from, to)?;
                Operand::array(ArrayView::new(
                    self.type_name.clone(),
                    sub,
                    base,
                    Rc::clone(&self.store),
                ))
            }
            None if range.is_none() && evaluated.len() == 1 && store.supports_rows() => {
                self.read_row(&*store, self.locator, evaluated[0], &label)?
            }
            None if range.is_some() || !evaluated.is_empty() => return Err(self.not_an_array()),
            None => self.read_cell(&*store, self.locator, ctx)?,
        };
        value.set_label(label);
        Ok(value)
    }

    fn read_cell(&self, store: &dyn Store, locator: Locator, ctx: &EvalContext) -> Result<Operand> {
        if self.flags.is_const {
            store.read_const_item(locator, ctx)
        } else {
            store.read_item(locator, ctx)
        }
    }

    fn read_row(&self, store: &dyn Store, locator: Locator, row: i64, label: &str) -> Result<Operand> {
        store
            .read_row(locator, row)
            .map(Slot::into_operand)
            .ok_or_else(|| EvalError::UninitializedRead {
                name: label.to_string(),
                what: format!("Row {}", row),
            })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════

    /// Write `value` at `indexes`.
    ///
    /// A tuple addressing one cell writes that cell. A partial tuple
    /// assigns every cell below it, in row-major order, taking each
    /// element from the sequence or indexable operand given.
    ///
    /// # Errors
    ///
    /// Returns `DoubleInitialization` when `ctx.force_init` is set and a
    /// cell was already initialized, `ConstViolation` when overwriting an
    /// initialized cell of a const binding, `TypeError` for a sequence
    /// longer than the assigned region, and addressing errors.
    pub fn set(&mut self, value: impl Into<Assign>, indexes: &[i64], ctx: &EvalContext) -> Result<()> {
        let value = value.into();
        trace!(name = %self.name, ?indexes, force_init = ctx.force_init, "write");
        let partial = match &self.shape {
            Some(shape) if self.row_key(indexes).is_none() && !shape.is_fully_indexed(indexes) => {
                shape.offset(indexes)?;
                Some(shape.lengths()[indexes.len()..].to_vec())
            }
            _ => None,
        };
        let Some(lengths) = partial else {
            let item = value.into_single(&self.name)?;
            return self.set_one(item, indexes, ctx);
        };

        let cells = RowMajor::new(&lengths);
        debug!(name = %self.name, ?indexes, cells = cells.len(), "array assignment");
        let shape = || {
            lengths
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        if let Assign::Seq(items) = &value {
            if items.len() > cells.len() {
                return Err(EvalError::type_error(format!(
                    "cannot assign {} values to {}{} of shape [{}]",
                    items.len(),
                    self.name,
                    suffix(indexes),
                    shape()
                )));
            }
        }
        for (position, relative) in cells.enumerate() {
            let item = match &value {
                Assign::Seq(items) => {
                    items
                        .get(position)
                        .cloned()
                        .ok_or_else(|| EvalError::OutOfBounds {
                            index: position as i64,
                            len: items.len(),
                        })?
                }
                Assign::Indexed(source) => Slot::from(source.get_item(&relative)?),
                Assign::Item(_) => {
                    return Err(EvalError::type_error(format!(
                        "cannot assign a single value to {}{} of shape [{}]",
                        self.name,
                        suffix(indexes),
                        shape()
                    )))
                }
            };
            let mut cell = indexes.to_vec();
            cell.extend(relative);
            self.set_one(item, &cell, ctx)?;
        }
        Ok(())
    }

    /// Initializing write: `set` that fails on already-initialized cells.
    pub fn init(&mut self, value: impl Into<Assign>, indexes: &[i64], ctx: &EvalContext) -> Result<()> {
        let ctx = ctx.clone().with_force_init(true);
        self.set(value, indexes, &ctx)
    }

    fn set_one(&mut self, value: Slot, indexes: &[i64], ctx: &EvalContext) -> Result<()> {
        if !self.is_initialized(indexes) {
            self.write(value, indexes)?;
            return self.mark_as_initialized(indexes);
        }
        if ctx.force_init {
            return Err(EvalError::DoubleInitialization {
                name: self.name.clone(),
                indexes: indexes.to_vec(),
            });
        }
        if self.flags.is_const {
            return Err(EvalError::ConstViolation {
                name: self.name.clone(),
                indexes: indexes.to_vec(),
            });
        }
        self.write(value, indexes)
    }

    fn write(&self, value: Slot, indexes: &[i64]) -> Result<()> {
        let address = self.address(indexes)?;
        let mut store = self.store.borrow_mut();
        match address {
            Address::Row { locator, row } => store.write_row(locator, row, value),
            Address::Scalar(locator) | Address::Indexed(locator) => {
                store.write(locator, value);
                Ok(())
            }
        }
    }

    fn not_an_array(&self) -> EvalError {
        EvalError::NotAnArray {
            name: self.name.clone(),
        }
    }

    fn uninitialized(&self, what: String) -> EvalError {
        EvalError::UninitializedRead {
            name: self.name.clone(),
            what,
        }
    }
}

fn suffix(indexes: &[i64]) -> String {
    indexes.iter().map(|index| format!("[{}]", index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn scalar(store: &SharedStore) -> Reference {
        let locator = store.borrow_mut().reserve(1);
        Reference::new("x", "int", false, locator, Rc::clone(store))
    }

    fn array(store: &SharedStore, lengths: Vec<usize>) -> Reference {
        let shape = Shape::new(lengths);
        let locator = store.borrow_mut().reserve(shape.size());
        Reference::new("A", "int", false, locator, Rc::clone(store)).with_shape(shape)
    }

    #[test]
    fn test_valid_indexes() {
        let store = MemoryStore::new().shared();
        let x = scalar(&store);
        assert!(x.is_valid_indexes(&[]));
        assert!(!x.is_valid_indexes(&[0]));

        let a = array(&store, vec![2, 3]);
        assert!(a.is_valid_indexes(&[1, 2]));
        assert!(!a.is_valid_indexes(&[2, 0]));
    }

    #[test]
    fn test_id_on_scalar() {
        let store = MemoryStore::new().shared();
        let x = scalar(&store);
        assert_eq!(x.id(&[]).unwrap(), x.locator());
        assert!(matches!(x.id(&[0]), Err(EvalError::NotAnArray { .. })));
    }

    #[test]
    fn test_id_on_array() {
        let store = MemoryStore::new().shared();
        let _pad = scalar(&store);
        let a = array(&store, vec![2, 3]);
        assert_eq!(a.id(&[1, 1]).unwrap(), a.locator().offset(4));
    }

    #[test]
    fn test_mark_scalar_twice_fails() {
        let store = MemoryStore::new().shared();
        let mut x = scalar(&store);
        x.mark_as_initialized(&[]).unwrap();
        assert!(x.is_initialized(&[]));
        assert!(matches!(
            x.mark_as_initialized(&[]),
            Err(EvalError::DoubleInitialization { .. })
        ));
    }

    #[test]
    fn test_address_modes() {
        let plain = MemoryStore::new().shared();
        let x = scalar(&plain);
        assert_eq!(x.address(&[]).unwrap(), Address::Scalar(x.locator()));

        let rows = MemoryStore::with_rows().shared();
        let y = scalar(&rows);
        assert_eq!(
            y.address(&[4]).unwrap(),
            Address::Row { locator: y.locator(), row: 4 }
        );
        assert!(matches!(y.address(&[1, 2]), Err(EvalError::NotAnArray { .. })));

        let a = array(&rows, vec![3]);
        assert_eq!(
            a.address(&[2, 7]).unwrap(),
            Address::Row { locator: a.locator().offset(2), row: 7 }
        );
        assert_eq!(a.address(&[2]).unwrap(), Address::Indexed(a.locator().offset(2)));
    }

    #[test]
    fn test_named_flags() {
        let store = MemoryStore::new().shared();
        let x = scalar(&store).with_flag("witness", true).unwrap();
        assert_eq!(x.flags().get("witness"), Some(true));
        assert_eq!(x.flags().get("const"), Some(false));

        let err = x.with_flag("witness", false).unwrap_err();
        assert!(matches!(err, EvalError::PropertyCollision { .. }));

        let err = scalar(&store).with_flag("const", true).unwrap_err();
        assert!(matches!(err, EvalError::PropertyCollision { ref name, .. } if name == "const"));
    }

    #[test]
    fn test_single_value_to_array_rejected() {
        let store = MemoryStore::new().shared();
        let mut a = array(&store, vec![2]);
        let err = a.set(5i64, &[], &EvalContext::new()).unwrap_err();
        assert!(matches!(err, EvalError::TypeError { .. }));
    }
}
