//! Abstract Syntax Tree types for filter expressions.
//!
//! The tree is a closed set of node kinds. Boolean connectors, negation,
//! grouping and collections are walked over; comparisons are the only nodes
//! the extractor and rewriter inspect.

use std::fmt;

/// Boolean connector joining two or more operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoolOperator {
    /// `and`
    And,
    /// `or`
    Or,
}

impl fmt::Display for BoolOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolOperator::And => write!(f, "and"),
            BoolOperator::Or => write!(f, "or"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOperator {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `is`
    Is,
    /// `is not`
    IsNot,
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOperator::Eq => "==",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtE => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtE => ">=",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
        };
        write!(f, "{}", op)
    }
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    /// String literal (already unescaped).
    Str(String),
    /// Numeric literal, kept as written.
    Number(String),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    None,
}

impl Literal {
    /// Returns the string value if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{}", quote_str(s)),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(true) => write!(f, "True"),
            Literal::Bool(false) => write!(f, "False"),
            Literal::None => write!(f, "None"),
        }
    }
}

/// A filter expression.
///
/// # Example
///
/// ```rust
/// use cxg_filter::{parse, Expr};
///
/// let expr = parse("cell_type == 'neuron' and sex == 'female'").unwrap();
/// assert!(matches!(expr, Expr::BoolOp { .. }));
/// assert_eq!(expr.to_string(), "cell_type == 'neuron' and sex == 'female'");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// Two or more operands joined by the same connector.
    BoolOp {
        /// Connector.
        op: BoolOperator,
        /// Operands in source order.
        operands: Vec<Expr>,
    },

    /// `not operand`
    Not(Box<Expr>),

    /// `left op right`
    Compare {
        /// Left-hand side.
        left: Box<Expr>,
        /// Operator.
        op: CompareOperator,
        /// Right-hand side.
        right: Box<Expr>,
    },

    /// Bare identifier (a column name).
    Name(String),

    /// Literal constant.
    Literal(Literal),

    /// `[a, b, ...]`
    List(Vec<Expr>),

    /// `(a, b, ...)`
    Tuple(Vec<Expr>),

    /// Parenthesized sub-expression: `(expr)`
    Nested(Box<Expr>),
}

impl Expr {
    /// Creates a string literal node.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    /// Creates a list of string literals.
    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::List(values.into_iter().map(Expr::string).collect())
    }

    /// Returns the identifier if this node is a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the string value if this node is a string literal.
    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal(lit) => lit.as_str(),
            _ => None,
        }
    }

    /// Returns the direct children of this node, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::BoolOp { operands, .. } => operands.iter().collect(),
            Expr::Not(inner) | Expr::Nested(inner) => vec![inner.as_ref()],
            Expr::Compare { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::List(items) | Expr::Tuple(items) => items.iter().collect(),
            Expr::Name(_) | Expr::Literal(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BoolOp { op, operands } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "{}", operand)?;
                }
                Ok(())
            }
            Expr::Not(inner) => write!(f, "not {}", inner),
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Name(name) => write!(f, "{}", name),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Expr::Nested(inner) => write!(f, "({})", inner),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Quotes a string the way Python's `repr` does: single quotes unless the
/// value contains a single quote and no double quote.
pub(crate) fn quote_str(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => match c as u32 {
                code @ 0..=0xff => out.push_str(&format!("\\x{:02x}", code)),
                code @ 0x100..=0xffff => out.push_str(&format!("\\u{:04x}", code)),
                code => out.push_str(&format!("\\U{:08x}", code)),
            },
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
