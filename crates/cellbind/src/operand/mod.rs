//! Expression operands
//!
//! Operands are the values an evaluator passes around: integers, index
//! ranges, array views over shared storage, operand lists and the small
//! set of compound forms needed to express indexes and arguments.

mod array;
mod display;
mod list;
mod range;

pub use array::ArrayView;
pub use list::OperandList;
pub use range::RangeIndex;

use crate::context::EvalContext;
use crate::error::{kind_name, EvalError, Result};

/// Arithmetic operator of a binary operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
}

impl BinaryOp {
    /// Source symbol of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64> {
        let result = match self {
            BinaryOp::Add => lhs.checked_add(rhs),
            BinaryOp::Sub => lhs.checked_sub(rhs),
            BinaryOp::Mul => lhs.checked_mul(rhs),
        };
        result.ok_or_else(|| {
            EvalError::type_error(format!("integer overflow in {} {} {}", lhs, self.symbol(), rhs))
        })
    }
}

/// The kind of an operand.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandKind {
    /// Integer value
    Int(i64),

    /// `from..to` index range, only meaningful as the last index
    Range(RangeIndex),

    /// Array-typed view over a region of shared storage
    Array(ArrayView),

    /// Ordered operand list
    List(OperandList),

    /// Variadic operand, expanded into its elements when unrolled
    Spread(Box<Operand>),

    /// Expression made of a single operand
    Group(Box<Operand>),

    /// Integer negation
    Neg(Box<Operand>),

    /// Integer arithmetic
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Operand>,
        /// Right operand
        rhs: Box<Operand>,
    },
}

/// An evaluable operand with an optional diagnostic label.
///
/// Cloning is always deep for the operand tree; only array views share
/// their storage, which is the point of a view. Equality ignores labels.
#[derive(Clone)]
pub struct Operand {
    kind: OperandKind,
    label: Option<String>,
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<OperandKind> for Operand {
    fn from(kind: OperandKind) -> Self {
        Self { kind, label: None }
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::int(value)
    }
}

impl Operand {
    // ═══════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════

    /// Create an integer operand
    pub fn int(value: i64) -> Self {
        OperandKind::Int(value).into()
    }

    /// Create a range operand; absent bounds cover the whole dimension
    pub fn range(from: Option<Operand>, to: Option<Operand>) -> Self {
        OperandKind::Range(RangeIndex::new(from, to)).into()
    }

    /// Create an array view operand
    pub fn array(view: ArrayView) -> Self {
        OperandKind::Array(view).into()
    }

    /// Create a list operand
    pub fn list(list: OperandList) -> Self {
        OperandKind::List(list).into()
    }

    /// Create an unrollable operand
    pub fn spread(inner: Operand) -> Self {
        OperandKind::Spread(Box::new(inner)).into()
    }

    /// Wrap a single operand as an expression
    pub fn group(inner: Operand) -> Self {
        OperandKind::Group(Box::new(inner)).into()
    }

    /// Create a negation
    pub fn neg(inner: Operand) -> Self {
        OperandKind::Neg(Box::new(inner)).into()
    }

    /// Create a binary arithmetic operand
    pub fn binary(op: BinaryOp, lhs: Operand, rhs: Operand) -> Self {
        OperandKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
        .into()
    }

    /// Attach a label (builder pattern)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors and kind predicates
    // ═══════════════════════════════════════════════════════════════════

    /// The operand's kind
    pub fn kind(&self) -> &OperandKind {
        &self.kind
    }

    /// Mutable access to the operand's kind
    pub fn kind_mut(&mut self) -> &mut OperandKind {
        &mut self.kind
    }

    /// The diagnostic label, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the diagnostic label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    /// Check if this is an integer
    pub fn is_int(&self) -> bool {
        matches!(self.kind, OperandKind::Int(_))
    }

    /// Check if this is an index range
    pub fn is_range(&self) -> bool {
        matches!(self.kind, OperandKind::Range(_))
    }

    /// Check if this is an array view
    pub fn is_array(&self) -> bool {
        matches!(self.kind, OperandKind::Array(_))
    }

    /// Check if this is an operand list
    pub fn is_list(&self) -> bool {
        matches!(self.kind, OperandKind::List(_))
    }

    /// Check if this expression consists of a single operand
    pub fn is_single_operand_wrapper(&self) -> bool {
        matches!(self.kind, OperandKind::Group(_))
    }

    /// The wrapped operand of a single-operand expression
    pub fn single_operand(&self) -> Option<&Operand> {
        match &self.kind {
            OperandKind::Group(inner) => Some(inner),
            _ => None,
        }
    }

    /// Check if this operand expands into several when unrolled
    pub fn is_unrollable(&self) -> bool {
        matches!(self.kind, OperandKind::Spread(_))
    }

    /// The index range of this operand, looking through single-operand
    /// expressions.
    pub fn as_range(&self) -> Option<&RangeIndex> {
        match &self.kind {
            OperandKind::Range(range) => Some(range),
            OperandKind::Group(inner) => inner.as_range(),
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Evaluation
    // ═══════════════════════════════════════════════════════════════════

    /// Coerce to an integer, computing arithmetic on the way.
    pub fn as_int(&self) -> Result<i64> {
        match &self.kind {
            OperandKind::Int(value) => Ok(*value),
            OperandKind::Group(inner) => inner.as_int(),
            OperandKind::Neg(inner) => inner
                .as_int()?
                .checked_neg()
                .ok_or_else(|| EvalError::type_error("integer overflow in negation")),
            OperandKind::Binary { op, lhs, rhs } => op.apply(lhs.as_int()?, rhs.as_int()?),
            _ => Err(EvalError::type_error(format!(
                "expected int, got {}",
                kind_name(self)
            ))),
        }
    }

    /// Evaluate to a value: arithmetic collapses to integers, containers
    /// evaluate their contents left to right.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Operand> {
        let kind = match &self.kind {
            OperandKind::Int(_) | OperandKind::Array(_) => self.kind.clone(),
            OperandKind::Neg(_) | OperandKind::Binary { .. } => OperandKind::Int(self.as_int()?),
            OperandKind::Group(inner) => return inner.evaluate(ctx),
            OperandKind::Range(range) => OperandKind::Range(range.evaluate(ctx)?),
            OperandKind::List(list) => OperandKind::List(list.evaluate(ctx)?),
            OperandKind::Spread(inner) => OperandKind::Spread(Box::new(inner.evaluate(ctx)?)),
        };
        Ok(self.relabel(kind))
    }

    /// Instantiate for use as an argument.
    ///
    /// Structure is kept, so a single-operand expression stays one. A
    /// spread operand expands into a list of its elements when `ctx.unroll`
    /// is set and is left marked otherwise, for the caller to splice.
    pub fn instantiate(&self, ctx: &EvalContext) -> Result<Operand> {
        let kind = match &self.kind {
            OperandKind::Int(_) | OperandKind::Array(_) => self.kind.clone(),
            OperandKind::Range(range) => OperandKind::Range(range.instantiate(ctx)?),
            OperandKind::List(list) => OperandKind::List(list.materialize(ctx)?),
            OperandKind::Group(inner) => OperandKind::Group(Box::new(inner.instantiate(ctx)?)),
            OperandKind::Neg(inner) => OperandKind::Neg(Box::new(inner.instantiate(ctx)?)),
            OperandKind::Binary { op, lhs, rhs } => OperandKind::Binary {
                op: *op,
                lhs: Box::new(lhs.instantiate(ctx)?),
                rhs: Box::new(rhs.instantiate(ctx)?),
            },
            OperandKind::Spread(inner) => {
                let inner = inner.instantiate(ctx)?;
                if ctx.unroll {
                    OperandKind::List(OperandList::from_vec(inner.elements()?))
                } else {
                    OperandKind::Spread(Box::new(inner))
                }
            }
        };
        Ok(self.relabel(kind))
    }

    /// The operands a spread operand expands into.
    pub fn unroll(&self) -> Result<Vec<Operand>> {
        match &self.kind {
            OperandKind::Spread(inner) => inner.elements(),
            _ => Err(EvalError::type_error(format!(
                "cannot unroll {}",
                kind_name(self)
            ))),
        }
    }

    /// Read an element of an indexable operand.
    pub fn get_item(&self, indexes: &[i64]) -> Result<Operand> {
        if indexes.is_empty() {
            return Ok(self.clone());
        }
        match &self.kind {
            OperandKind::List(list) => list.get_item(indexes),
            OperandKind::Array(view) => view.get_item(indexes),
            OperandKind::Group(inner) => inner.get_item(indexes),
            _ => Err(EvalError::NotAnArray {
                name: self.label.clone().unwrap_or_else(|| self.to_string()),
            }),
        }
    }

    /// Elements along the outermost dimension of a container.
    fn elements(&self) -> Result<Vec<Operand>> {
        match &self.kind {
            OperandKind::List(list) => Ok(list.iter().cloned().collect()),
            OperandKind::Array(view) => view.elements(),
            OperandKind::Group(inner) | OperandKind::Spread(inner) => inner.elements(),
            _ => Err(EvalError::type_error(format!(
                "cannot unroll {}",
                kind_name(self)
            ))),
        }
    }

    fn relabel(&self, kind: OperandKind) -> Operand {
        Operand {
            kind,
            label: self.label.clone(),
        }
    }
}
