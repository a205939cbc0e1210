//! Multi-dimensional shape descriptor
//!
//! A [`Shape`] knows the dimension lengths of an array, turns index tuples
//! into flat offsets (row-major), derives sub-shapes for partial and sliced
//! access, and keeps one initialization bit per cell.

use crate::error::{EvalError, Result};
use crate::store::Locator;

/// Dimension lengths, row-major strides and a per-cell initialized bitset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    lengths: Vec<usize>,
    strides: Vec<usize>,
    initialized: Vec<bool>,
}

impl Shape {
    /// Create a shape with every cell uninitialized.
    pub fn new(lengths: Vec<usize>) -> Self {
        let mut strides = vec![1; lengths.len()];
        for level in (0..lengths.len().saturating_sub(1)).rev() {
            strides[level] = strides[level + 1] * lengths[level + 1];
        }
        let size = lengths.iter().product();
        Self {
            lengths,
            strides,
            initialized: vec![false; size],
        }
    }

    /// Shape and storage size for a declaration with the given lengths.
    ///
    /// No lengths means a scalar, which needs a single storage cell.
    pub fn for_lengths(lengths: &[usize]) -> (Option<Shape>, usize) {
        if lengths.is_empty() {
            return (None, 1);
        }
        let shape = Shape::new(lengths.to_vec());
        let size = shape.size();
        (Some(shape), size)
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.lengths.len()
    }

    /// Length of each dimension, outermost first.
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.initialized.len()
    }

    /// Whether `indexes` addresses a cell or a sub-region of this shape.
    pub fn is_valid_indexes(&self, indexes: &[i64]) -> bool {
        indexes.len() <= self.dim()
            && indexes
                .iter()
                .zip(&self.lengths)
                .all(|(&index, &len)| index >= 0 && (index as usize) < len)
    }

    /// Whether `indexes` addresses exactly one cell.
    pub fn is_fully_indexed(&self, indexes: &[i64]) -> bool {
        indexes.len() == self.dim()
    }

    /// Flat offset of the first cell addressed by `indexes`.
    pub fn offset(&self, indexes: &[i64]) -> Result<usize> {
        self.check(indexes)?;
        Ok(indexes
            .iter()
            .zip(&self.strides)
            .map(|(&index, &stride)| index as usize * stride)
            .sum())
    }

    /// Combine a base locator with an index tuple.
    pub fn locator(&self, base: Locator, indexes: &[i64]) -> Result<Locator> {
        Ok(base.offset(self.offset(indexes)?))
    }

    /// Whether every cell addressed by `indexes` has been initialized.
    pub fn is_initialized(&self, indexes: &[i64]) -> bool {
        match self.region(indexes) {
            Ok(mut cells) => cells.all(|cell| self.initialized[cell]),
            Err(_) => false,
        }
    }

    /// Mark every cell addressed by `indexes` as initialized.
    pub fn mark_as_initialized(&mut self, indexes: &[i64]) -> Result<()> {
        let cells: Vec<usize> = self.region(indexes)?.collect();
        for cell in cells {
            self.initialized[cell] = true;
        }
        Ok(())
    }

    /// Derive the shape of a partial or sliced access.
    ///
    /// `indexes` fixes the outer dimensions; an optional `from..to` range
    /// (half-open, bounds default to the whole dimension) narrows the next
    /// one. The returned locator is the base of the derived region, so the
    /// derived shape addresses the same cells as the parent.
    pub fn sub_shape(
        &self,
        indexes: &[i64],
        base: Locator,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<(Shape, Locator)> {
        let fixed = indexes.len();
        let sliced = from.is_some() || to.is_some();
        if fixed > self.dim() || (sliced && fixed == self.dim()) {
            return Err(self.out_of_shape(indexes));
        }
        let mut start = self.offset(indexes)?;
        let mut lengths = self.lengths[fixed..].to_vec();

        if sliced {
            let len = lengths[0] as i64;
            let from = from.unwrap_or(0);
            let to = to.unwrap_or(len);
            if from < 0 || to < from || to > len {
                let mut bad = indexes.to_vec();
                bad.push(if from < 0 || from > len { from } else { to });
                return Err(self.out_of_shape(&bad));
            }
            lengths[0] = (to - from) as usize;
            start += from as usize * self.strides[fixed];
        }

        let mut derived = Shape::new(lengths);
        let strides = &self.strides[fixed..];
        for (cell, position) in RowMajor::new(derived.lengths()).enumerate() {
            let source = start
                + position
                    .iter()
                    .zip(strides)
                    .map(|(&index, &stride)| index as usize * stride)
                    .sum::<usize>();
            derived.initialized[cell] = self.initialized[source];
        }
        Ok((derived, base.offset(start)))
    }

    /// Flat offsets of every cell addressed by `indexes`, row-major.
    fn region(&self, indexes: &[i64]) -> Result<impl Iterator<Item = usize> + '_> {
        let start = self.offset(indexes)?;
        let strides = &self.strides[indexes.len()..];
        Ok(RowMajor::new(&self.lengths[indexes.len()..]).map(move |position| {
            start
                + position
                    .iter()
                    .zip(strides)
                    .map(|(&index, &stride)| index as usize * stride)
                    .sum::<usize>()
        }))
    }

    fn check(&self, indexes: &[i64]) -> Result<()> {
        if self.is_valid_indexes(indexes) {
            Ok(())
        } else {
            Err(self.out_of_shape(indexes))
        }
    }

    fn out_of_shape(&self, indexes: &[i64]) -> EvalError {
        EvalError::IndexOutOfShape {
            indexes: indexes.to_vec(),
            lengths: self.lengths.clone(),
        }
    }
}

/// Row-major counter over every index tuple of a set of dimension lengths.
///
/// Yields nothing when any length is zero and a single empty tuple when
/// there are no dimensions at all.
#[derive(Debug, Clone)]
pub struct RowMajor {
    lengths: Vec<usize>,
    next: usize,
    total: usize,
}

impl RowMajor {
    /// Iterate over all positions of `lengths`.
    pub fn new(lengths: &[usize]) -> Self {
        Self {
            lengths: lengths.to_vec(),
            next: 0,
            total: lengths.iter().product(),
        }
    }
}

impl Iterator for RowMajor {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let mut rest = self.next;
        let mut position = vec![0; self.lengths.len()];
        for (slot, &len) in position.iter_mut().zip(&self.lengths).rev() {
            *slot = (rest % len) as i64;
            rest /= len;
        }
        self.next += 1;
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for RowMajor {}
