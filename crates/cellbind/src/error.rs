//! Error types for reference resolution and operand handling

use proc_macro2::Span;
use thiserror::Error;

use crate::context::SourceLocation;
use crate::operand::{Operand, OperandKind};

/// Errors raised while resolving, reading or writing through the core.
///
/// Every variant signals a semantic error in the evaluated program. None of
/// them is recoverable locally: the current evaluation is aborted and the
/// caller decides how to report it.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// A list index outside `[0, len)`
    #[error("Out of bounds, try to access index {index} but list only has {len} elements")]
    OutOfBounds {
        /// The offending index
        index: i64,
        /// Length of the indexed list
        len: usize,
    },

    /// An index tuple that does not fit the shape of an array
    #[error("index [{}] out of range for shape [{}]", join(.indexes), join(.lengths))]
    IndexOutOfShape {
        /// The offending index tuple
        indexes: Vec<i64>,
        /// Dimension lengths of the array
        lengths: Vec<usize>,
    },

    /// Indexing a binding that has neither a shape nor row storage
    #[error("try to access to index on non-array value {name}")]
    NotAnArray {
        /// Name of the binding (or a description of the value)
        name: String,
    },

    /// Forced initialization of a cell that was already initialized
    #[error("value initialized: {name}{}", suffix(.indexes))]
    DoubleInitialization {
        /// Name of the binding
        name: String,
        /// Cell inside the binding, empty for scalars
        indexes: Vec<i64>,
    },

    /// Overwriting an initialized cell of a const binding
    #[error("setting {name}{} a const element", suffix(.indexes))]
    ConstViolation {
        /// Name of the binding
        name: String,
        /// Cell inside the binding, empty for scalars
        indexes: Vec<i64>,
    },

    /// Reading a cell or row before anything was written to it
    #[error("{what} of {name} isn't initialized")]
    UninitializedRead {
        /// Name of the binding (or its label)
        name: String,
        /// Which part was read, e.g. `row 3` or `cell [1][2]`
        what: String,
    },

    /// A range index anywhere but the last position
    #[error("range index is valid only in last index (found at position {position} of {count})")]
    MisplacedRange {
        /// Zero-based position of the range index
        position: usize,
        /// Number of indexes in the access
        count: usize,
    },

    /// A named flag that collides with an existing reference property
    #[error("property `{name}` already exists on reference {reference}")]
    PropertyCollision {
        /// The colliding property name
        name: String,
        /// Name of the reference
        reference: String,
    },

    /// An operand of the wrong kind for the requested operation
    #[error("Type error: {message}")]
    TypeError {
        /// Description of the mismatch
        message: String,
    },

    /// Lookup of a name with no binding in scope
    #[error("undefined reference `{name}`")]
    UndefinedReference {
        /// The missing name
        name: String,
    },

    /// Syntax the frontend cannot lower into an operand
    #[error("unsupported expression: {kind}")]
    UnsupportedExpr {
        /// Kind of expression
        kind: String,
        /// Location in the parsed source
        span: Option<Span>,
    },

    /// Another error, annotated with the source location being evaluated
    #[error("{source} at {location}")]
    At {
        /// Where evaluation was when the error was raised
        location: SourceLocation,
        /// The underlying error
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Attach a source location, unless one is already attached.
    pub fn at(self, location: Option<&SourceLocation>) -> Self {
        match (self, location) {
            (err @ EvalError::At { .. }, _) | (err, None) => err,
            (err, Some(location)) => EvalError::At {
                location: location.clone(),
                source: Box::new(err),
            },
        }
    }

    /// The error without any attached location.
    pub fn root(&self) -> &EvalError {
        match self {
            EvalError::At { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::TypeError {
            message: message.into(),
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Human-readable name of an operand's kind, for error messages.
pub fn kind_name(operand: &Operand) -> &'static str {
    match operand.kind() {
        OperandKind::Int(_) => "int",
        OperandKind::Range(_) => "range",
        OperandKind::Array(_) => "array",
        OperandKind::List(_) => "list",
        OperandKind::Spread(_) => "spread",
        OperandKind::Group(_) => "group",
        OperandKind::Neg(_) => "negation",
        OperandKind::Binary { .. } => "binary operation",
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn suffix(indexes: &[i64]) -> String {
    indexes.iter().map(|i| format!("[{}]", i)).collect()
}
