//! Display and Debug implementations for operands

use std::fmt;

use super::*;

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OperandKind::Int(value) => write!(f, "{}", value),
            OperandKind::Range(range) => write!(f, "{}", range),
            OperandKind::Array(view) => {
                write!(f, "{}", view.type_name())?;
                for len in view.shape().lengths() {
                    write!(f, "[{}]", len)?;
                }
                write!(f, "{}", view.base())
            }
            OperandKind::List(list) => write!(f, "{}", list),
            OperandKind::Spread(inner) => write!(f, "...{}", inner),
            OperandKind::Group(inner) => write!(f, "({})", inner),
            OperandKind::Neg(inner) => write!(f, "-{}", inner),
            OperandKind::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
        }
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} /* {} */", self, label),
            None => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for RangeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(from) = self.from() {
            write!(f, "{}", from)?;
        }
        write!(f, "..")?;
        if let Some(to) = self.to() {
            write!(f, "{}", to)?;
        }
        Ok(())
    }
}

impl fmt::Display for OperandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", item)?;
        }
        write!(f, "]")
    }
}
