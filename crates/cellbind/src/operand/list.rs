//! Ordered operand lists

use tracing::debug;

use crate::context::EvalContext;
use crate::error::{EvalError, Result};
use crate::shape::Shape;

use super::Operand;

/// An owned, ordered sequence of operands.
///
/// A list never aliases the caller's operands: [`OperandList::new`] and
/// [`OperandList::push`] clone what they are given, and
/// [`OperandList::from_vec`] takes the caller's vector outright. Lists
/// built while parsing are only appended to; evaluation and
/// materialization always produce new lists.
#[derive(Debug, Clone, Default)]
pub struct OperandList {
    items: Vec<Operand>,
    label: Option<String>,
}

impl OperandList {
    /// Create a list holding clones of `items`.
    pub fn new(items: &[Operand]) -> Self {
        Self {
            items: items.to_vec(),
            label: None,
        }
    }

    /// Create a list taking ownership of `items` without cloning.
    pub fn from_vec(items: Vec<Operand>) -> Self {
        Self { items, label: None }
    }

    /// Append a clone of `item`.
    pub fn push(&mut self, item: &Operand) {
        self.items.push(item.clone());
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items in order
    pub fn iter(&self) -> std::slice::Iter<'_, Operand> {
        self.items.iter()
    }

    /// Get an item by position
    pub fn get(&self, index: usize) -> Option<&Operand> {
        self.items.get(index)
    }

    /// Get a mutable item by position
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Operand> {
        self.items.get_mut(index)
    }

    /// The display label, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the display label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// One-dimensional shape with the list's length
    pub fn shape(&self) -> Shape {
        Shape::new(vec![self.items.len()])
    }

    /// Evaluate every item, left to right, into a new list.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<OperandList> {
        self.items.iter().map(|item| item.evaluate(ctx)).collect()
    }

    /// Instantiate every item into a new list, splicing variadic operands.
    ///
    /// Items are instantiated with unrolling disabled. An item that ends up
    /// as a single-operand expression around a spread operand is replaced
    /// by the spread's elements, in place; every other item is kept as is.
    pub fn materialize(&self, ctx: &EvalContext) -> Result<OperandList> {
        let local = ctx.clone().with_unroll(false);
        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let instanced = item.instantiate(&local)?;
            if let Some(operand) = instanced.single_operand() {
                if operand.is_unrollable() {
                    let unrolled = operand.unroll()?;
                    debug!(count = unrolled.len(), "splicing unrolled operand");
                    items.extend(unrolled);
                    continue;
                }
            }
            items.push(instanced);
        }
        Ok(OperandList::from_vec(items))
    }

    /// Read an item, delegating any further indexes to it.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if the first index is negative or not below the
    /// list's length.
    pub fn get_item(&self, indexes: &[i64]) -> Result<Operand> {
        let Some((&index, rest)) = indexes.split_first() else {
            return Ok(Operand::list(self.clone()));
        };
        if index < 0 || index as usize >= self.items.len() {
            return Err(EvalError::OutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        let item = &self.items[index as usize];
        if rest.is_empty() {
            Ok(item.clone())
        } else {
            item.get_item(rest)
        }
    }
}

impl PartialEq for OperandList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl FromIterator<Operand> for OperandList {
    fn from_iter<I: IntoIterator<Item = Operand>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a OperandList {
    type Item = &'a Operand;
    type IntoIter = std::slice::Iter<'a, Operand>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for OperandList {
    type Item = Operand;
    type IntoIter = std::vec::IntoIter<Operand>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::OperandKind;

    fn ints(values: &[i64]) -> OperandList {
        values.iter().copied().map(Operand::int).collect()
    }

    #[test]
    fn test_new_clones_items() {
        let mut source = vec![Operand::int(1), Operand::int(2)];
        let list = OperandList::new(&source);
        *source[0].kind_mut() = OperandKind::Int(100);
        assert_eq!(list.get(0), Some(&Operand::int(1)));
    }

    #[test]
    fn test_push_updates_length() {
        let mut list = OperandList::default();
        assert!(list.is_empty());
        list.push(&Operand::int(7));
        list.push(&Operand::int(8));
        assert_eq!(list.len(), 2);
        assert_eq!(list.shape().lengths(), &[2]);
    }

    #[test]
    fn test_get_item_bounds() {
        let list = ints(&[1, 2, 3]);
        assert_eq!(list.get_item(&[2]).unwrap(), Operand::int(3));
        assert!(matches!(
            list.get_item(&[3]),
            Err(EvalError::OutOfBounds { index: 3, len: 3 })
        ));
        assert!(matches!(
            list.get_item(&[-1]),
            Err(EvalError::OutOfBounds { index: -1, len: 3 })
        ));
    }

    #[test]
    fn test_materialize_without_spread_is_copy() {
        let list = ints(&[4, 5, 6]);
        let materialized = list.materialize(&EvalContext::new()).unwrap();
        assert_eq!(materialized, list);
    }

    #[test]
    fn test_materialize_keeps_bare_spread() {
        let list = OperandList::from_vec(vec![Operand::spread(Operand::list(ints(&[1, 2])))]);
        let materialized = list.materialize(&EvalContext::new()).unwrap();
        assert_eq!(materialized.len(), 1);
        assert!(materialized.get(0).map(Operand::is_unrollable).unwrap_or(false));
    }

    #[test]
    fn test_evaluate_is_independent_per_item() {
        let list = OperandList::from_vec(vec![
            Operand::neg(Operand::int(1)),
            Operand::group(Operand::int(2)),
        ]);
        assert_eq!(list.evaluate(&EvalContext::new()).unwrap(), ints(&[-1, 2]));
    }
}
