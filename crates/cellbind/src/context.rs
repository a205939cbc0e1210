//! Evaluation context configuration

use std::fmt;

/// Source code location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File name or identifier
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Options for a single evaluation, read or write.
///
/// This is passed through reads, writes, evaluation and materialization and
/// controls labelling, variadic unrolling and initialization semantics. The
/// location is owned by the evaluator; the core only reads it.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Label given to values produced by an indexed read
    pub label: Option<String>,

    /// Whether instantiating a spread operand expands it in place
    pub unroll: bool,

    /// Whether a write must be the initializing write of its cell
    pub force_init: bool,

    /// Source location currently being evaluated
    pub location: Option<SourceLocation>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            label: None,
            unroll: true,
            force_init: false,
            location: None,
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label for values produced under this context.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable spread unrolling.
    pub fn with_unroll(mut self, unroll: bool) -> Self {
        self.unroll = unroll;
        self
    }

    /// Require writes to be initializing writes.
    pub fn with_force_init(mut self, force_init: bool) -> Self {
        self.force_init = force_init;
        self
    }

    /// Set the current source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}
