//! Lowering of Rust-syntax expressions into operands
//!
//! Index and operand expressions are written with Rust syntax and parsed
//! with `syn`. Only the constant subset the core understands is lowered:
//! integer literals, unary minus, `+ - *`, parentheses, array literals
//! (operand lists) and ranges. A call to `spread(..)` marks its argument
//! as a variadic operand, to be spliced by materialization.

use proc_macro2::Span;
use syn::spanned::Spanned;

use crate::error::{EvalError, Result};
use crate::operand::{BinaryOp, Operand, OperandList};

/// Name of the call form producing a variadic operand.
pub const SPREAD: &str = "spread";

/// Parse a single expression.
///
/// # Errors
///
/// Returns `UnsupportedExpr` carrying the parser's message and span when
/// `source` is not a Rust expression.
pub fn parse_expr(source: &str) -> Result<syn::Expr> {
    syn::parse_str::<syn::Expr>(source).map_err(|e| EvalError::UnsupportedExpr {
        kind: format!("Rust syntax error: {}", e),
        span: Some(e.span()),
    })
}

/// Parse and lower an operand expression.
///
/// # Example
///
/// ```
/// use cellbind::frontend::parse_operand;
///
/// let operand = parse_operand("[1, 2 * 3]").unwrap();
/// assert_eq!(operand.to_string(), "[1,2 * 3]");
/// ```
pub fn parse_operand(source: &str) -> Result<Operand> {
    lower_expr(&parse_expr(source)?)
}

/// Lower an expression into an operand.
///
/// Parentheses become single-operand expressions. Inclusive ranges are
/// rewritten to their half-open equivalent, `a..=b` to `a..b + 1`.
pub fn lower_expr(expr: &syn::Expr) -> Result<Operand> {
    match expr {
        syn::Expr::Lit(lit) => lower_lit(lit),
        syn::Expr::Unary(unary) => match unary.op {
            syn::UnOp::Neg(_) => Ok(Operand::neg(lower_expr(&unary.expr)?)),
            _ => Err(unsupported(expr)),
        },
        syn::Expr::Binary(binary) => {
            let op = match binary.op {
                syn::BinOp::Add(_) => BinaryOp::Add,
                syn::BinOp::Sub(_) => BinaryOp::Sub,
                syn::BinOp::Mul(_) => BinaryOp::Mul,
                _ => return Err(unsupported(expr)),
            };
            Ok(Operand::binary(
                op,
                lower_expr(&binary.left)?,
                lower_expr(&binary.right)?,
            ))
        }
        syn::Expr::Paren(paren) => Ok(Operand::group(lower_expr(&paren.expr)?)),
        // Invisible groups come from macro expansion, not from the source
        syn::Expr::Group(group) => lower_expr(&group.expr),
        syn::Expr::Array(array) => {
            let items = array
                .elems
                .iter()
                .map(lower_expr)
                .collect::<Result<Vec<_>>>()?;
            Ok(Operand::list(OperandList::from_vec(items)))
        }
        syn::Expr::Range(range) => lower_range(range),
        syn::Expr::Call(call) if is_spread_call(call) => lower_spread(call),
        _ => Err(unsupported(expr)),
    }
}

/// Split an index expression such as `A[i][1..3]` into the indexed name
/// and its index operands, outermost first.
pub fn lower_index(index: &syn::ExprIndex) -> Result<(String, Vec<Operand>)> {
    let mut indexes = vec![lower_expr(&index.index)?];
    let mut base = &*index.expr;
    loop {
        match base {
            syn::Expr::Index(inner) => {
                indexes.push(lower_expr(&inner.index)?);
                base = &*inner.expr;
            }
            syn::Expr::Path(path) => {
                indexes.reverse();
                return Ok((path_name(path)?, indexes));
            }
            syn::Expr::Paren(paren) => base = &*paren.expr,
            other => return Err(unsupported(other)),
        }
    }
}

/// The identifier named by a single-segment path.
pub fn path_name(path: &syn::ExprPath) -> Result<String> {
    match path.path.get_ident() {
        Some(ident) if path.qself.is_none() => Ok(ident.to_string()),
        _ => Err(EvalError::UnsupportedExpr {
            kind: "qualified path".to_string(),
            span: Some(path.span()),
        }),
    }
}

/// The error reported for syntax outside the lowered subset.
pub(crate) fn unsupported(expr: &syn::Expr) -> EvalError {
    EvalError::UnsupportedExpr {
        kind: expr_kind_name(expr).to_string(),
        span: Some(expr_span(expr)),
    }
}

fn lower_lit(lit: &syn::ExprLit) -> Result<Operand> {
    match &lit.lit {
        syn::Lit::Int(int) => {
            let value = int
                .base10_parse::<i64>()
                .map_err(|e| EvalError::type_error(format!("invalid integer literal: {}", e)))?;
            Ok(Operand::int(value))
        }
        other => Err(EvalError::UnsupportedExpr {
            kind: "non-integer literal".to_string(),
            span: Some(other.span()),
        }),
    }
}

fn lower_range(range: &syn::ExprRange) -> Result<Operand> {
    let from = range.start.as_deref().map(lower_expr).transpose()?;
    let to = range.end.as_deref().map(lower_expr).transpose()?;
    let to = match (&range.limits, to) {
        (syn::RangeLimits::Closed(_), Some(end)) => Some(Operand::binary(
            BinaryOp::Add,
            Operand::group(end),
            Operand::int(1),
        )),
        (_, to) => to,
    };
    Ok(Operand::range(from, to))
}

fn is_spread_call(call: &syn::ExprCall) -> bool {
    match &*call.func {
        syn::Expr::Path(path) => path.path.is_ident(SPREAD),
        _ => false,
    }
}

/// `spread(x)` spreads `x`; `spread(a, b, ..)` spreads the list of its
/// arguments.
fn lower_spread(call: &syn::ExprCall) -> Result<Operand> {
    let mut args = call
        .args
        .iter()
        .map(lower_expr)
        .collect::<Result<Vec<_>>>()?;
    let inner = if args.len() == 1 {
        args.remove(0)
    } else {
        Operand::list(OperandList::from_vec(args))
    };
    Ok(Operand::group(Operand::spread(inner)))
}

/// Get a human-readable name for an expression kind.
fn expr_kind_name(expr: &syn::Expr) -> &'static str {
    match expr {
        syn::Expr::Array(_) => "array",
        syn::Expr::Assign(_) => "assignment",
        syn::Expr::Async(_) => "async block",
        syn::Expr::Await(_) => "await",
        syn::Expr::Binary(_) => "binary operation",
        syn::Expr::Block(_) => "block",
        syn::Expr::Call(_) => "function call",
        syn::Expr::Cast(_) => "cast",
        syn::Expr::Closure(_) => "closure",
        syn::Expr::Field(_) => "field access",
        syn::Expr::If(_) => "if",
        syn::Expr::Index(_) => "index",
        syn::Expr::Lit(_) => "literal",
        syn::Expr::Macro(_) => "macro invocation",
        syn::Expr::Match(_) => "match",
        syn::Expr::MethodCall(_) => "method call",
        syn::Expr::Path(_) => "path",
        syn::Expr::Reference(_) => "reference",
        syn::Expr::Repeat(_) => "repeat",
        syn::Expr::Struct(_) => "struct literal",
        syn::Expr::Try(_) => "try",
        syn::Expr::Tuple(_) => "tuple",
        syn::Expr::Unary(_) => "unary operation",
        _ => "unknown",
    }
}

/// Get the span of an expression.
fn expr_span(expr: &syn::Expr) -> Span {
    use quote::ToTokens;
    expr.to_token_stream()
        .into_iter()
        .next()
        .map(|t| t.span())
        .unwrap_or_else(Span::call_site)
}
