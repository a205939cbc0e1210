//! Array views over shared storage

use std::fmt;
use std::rc::Rc;

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::shape::Shape;
use crate::store::{Locator, SharedStore};

use super::Operand;

/// An array-typed value addressing a region of a store.
///
/// Produced by partial or sliced access: the view does not copy anything,
/// it reads the parent's cells through the shared store, relative to its
/// own base locator.
#[derive(Clone)]
pub struct ArrayView {
    type_name: String,
    shape: Shape,
    base: Locator,
    store: SharedStore,
}

impl ArrayView {
    /// Create a view of `shape` cells starting at `base`.
    pub fn new(type_name: impl Into<String>, shape: Shape, base: Locator, store: SharedStore) -> Self {
        Self {
            type_name: type_name.into(),
            shape,
            base,
            store,
        }
    }

    /// Element type of the viewed array
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Shape of the view
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Locator of the first cell of the view
    pub fn base(&self) -> Locator {
        self.base
    }

    /// Length of the outermost dimension
    pub fn len(&self) -> usize {
        self.shape.lengths().first().copied().unwrap_or(0)
    }

    /// Check if the outermost dimension is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a cell, or a narrower view for a partial index tuple.
    pub fn get_item(&self, indexes: &[i64]) -> Result<Operand> {
        if self.shape.is_fully_indexed(indexes) {
            let locator = self.shape.locator(self.base, indexes)?;
            return self
                .store
                .borrow()
                .read_item(locator, &EvalContext::default());
        }
        if indexes.len() > self.shape.dim() {
            return Err(EvalError::IndexOutOfShape {
                indexes: indexes.to_vec(),
                lengths: self.shape.lengths().to_vec(),
            });
        }
        let (shape, base) = self.shape.sub_shape(indexes, self.base, None, None)?;
        Ok(Operand::array(ArrayView {
            type_name: self.type_name.clone(),
            shape,
            base,
            store: Rc::clone(&self.store),
        }))
    }

    /// Elements along the outermost dimension.
    pub fn elements(&self) -> Result<Vec<Operand>> {
        (0..self.len() as i64)
            .map(|index| self.get_item(&[index]))
            .collect()
    }
}

impl PartialEq for ArrayView {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.shape.lengths() == other.shape.lengths()
            && self.base == other.base
            && Rc::ptr_eq(&self.store, &other.store)
    }
}

impl fmt::Debug for ArrayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayView")
            .field("type_name", &self.type_name)
            .field("lengths", &self.shape.lengths())
            .field("base", &self.base)
            .finish()
    }
}
