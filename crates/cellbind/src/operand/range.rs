//! Index range operands

use crate::context::EvalContext;
use crate::error::Result;

use super::Operand;

/// A `from..to` slice used as the last index of an array access.
///
/// Either bound may be absent: a missing `from` starts at the beginning of
/// the dimension and a missing `to` runs to its end. Bounds are half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeIndex {
    from: Option<Box<Operand>>,
    to: Option<Box<Operand>>,
}

impl RangeIndex {
    /// Create a range from optional bound expressions.
    pub fn new(from: Option<Operand>, to: Option<Operand>) -> Self {
        Self {
            from: from.map(Box::new),
            to: to.map(Box::new),
        }
    }

    /// The lower bound expression
    pub fn from(&self) -> Option<&Operand> {
        self.from.as_deref()
    }

    /// The upper bound expression
    pub fn to(&self) -> Option<&Operand> {
        self.to.as_deref()
    }

    /// Evaluate both bounds to integers.
    pub fn bounds(&self) -> Result<(Option<i64>, Option<i64>)> {
        let from = self.from.as_ref().map(|bound| bound.as_int()).transpose()?;
        let to = self.to.as_ref().map(|bound| bound.as_int()).transpose()?;
        Ok((from, to))
    }

    pub(crate) fn evaluate(&self, ctx: &EvalContext) -> Result<Self> {
        Ok(Self {
            from: self.from.as_ref().map(|b| b.evaluate(ctx).map(Box::new)).transpose()?,
            to: self.to.as_ref().map(|b| b.evaluate(ctx).map(Box::new)).transpose()?,
        })
    }

    pub(crate) fn instantiate(&self, ctx: &EvalContext) -> Result<Self> {
        Ok(Self {
            from: self.from.as_ref().map(|b| b.instantiate(ctx).map(Box::new)).transpose()?,
            to: self.to.as_ref().map(|b| b.instantiate(ctx).map(Box::new)).transpose()?,
        })
    }
}
