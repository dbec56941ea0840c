//! Filter expression parser implementation using nom.
//!
//! Accepts the boolean expression subset used by dataset filters:
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr ("or" and_expr)*
//! and_expr   := not_expr ("and" not_expr)*
//! not_expr   := "not" not_expr | comparison
//! comparison := primary (compare_op primary)?
//! primary    := "(" ... ")" | "[" ... "]" | literal | name
//! compare_op := == | != | <= | >= | < | > | not in | in | is not | is
//! ```
//!
//! Chained comparisons (`a < b < c`) are rejected.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{
        char, digit1, hex_digit1, multispace0, multispace1, oct_digit1, one_of, satisfy,
    },
    combinator::{all_consuming, map, not, opt, recognize, value},
    multi::{many0, many1, separated_list0},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::{BoolOperator, CompareOperator, Expr, Literal};
use crate::error::{FilterError, FilterResult};

/// Words that can never be column names.
const RESERVED: &[&str] = &["and", "or", "not", "in", "is", "True", "False", "None"];

/// Parse a filter expression string.
///
/// # Arguments
/// * `input` - The filter expression to parse
///
/// # Returns
/// The parsed expression tree or an error
///
/// # Examples
///
/// ```rust
/// use cxg_filter::parse;
///
/// // Equality
/// let expr = parse("cell_type == 'neuron'").unwrap();
///
/// // Membership
/// let expr = parse("tissue in ['kidney', 'liver']").unwrap();
///
/// // Compound expression
/// let expr = parse("sex == 'female' and (disease == 'normal' or is_primary_data == True)").unwrap();
/// ```
pub fn parse(input: &str) -> FilterResult<Expr> {
    let input = input.trim();
    if input.is_empty() {
        return Err(FilterError::EmptyExpression);
    }

    match all_consuming(expression)(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let position = input.len() - e.input.len();
            Err(FilterError::ParseError {
                position,
                message: format!("unexpected input at: '{}'", truncate(e.input, 20)),
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(FilterError::Incomplete("expression".to_string())),
    }
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ============================================================================
// Boolean structure
// ============================================================================

fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, _) = ws(input)?;
    let (input, expr) = or_expr(input)?;
    let (input, _) = ws(input)?;
    Ok((input, expr))
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        pair(ws, keyword("or")),
        preceded(ws, and_expr),
    ))(input)?;
    Ok((input, fold_bool(BoolOperator::Or, first, rest)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(
        pair(ws, keyword("and")),
        preceded(ws, not_expr),
    ))(input)?;
    Ok((input, fold_bool(BoolOperator::And, first, rest)))
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(pair(keyword("not"), ws), not_expr), |inner| {
            Expr::Not(Box::new(inner))
        }),
        comparison,
    ))(input)
}

fn fold_bool(op: BoolOperator, first: Expr, rest: Vec<Expr>) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut operands = Vec::with_capacity(rest.len() + 1);
    operands.push(first);
    operands.extend(rest);
    Expr::BoolOp { op, operands }
}

// ============================================================================
// Comparisons
// ============================================================================

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, left) = primary(input)?;
    let (input, tail) = opt(pair(
        preceded(ws, compare_operator),
        preceded(ws, primary),
    ))(input)?;

    match tail {
        Some((op, right)) => Ok((
            input,
            Expr::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )),
        None => Ok((input, left)),
    }
}

fn compare_operator(input: &str) -> IResult<&str, CompareOperator> {
    alt((
        // Order matters - longer matches first
        value(CompareOperator::Eq, tag("==")),
        value(CompareOperator::NotEq, tag("!=")),
        value(CompareOperator::LtE, tag("<=")),
        value(CompareOperator::GtE, tag(">=")),
        value(CompareOperator::Lt, tag("<")),
        value(CompareOperator::Gt, tag(">")),
        value(
            CompareOperator::NotIn,
            tuple((keyword("not"), mws, keyword("in"))),
        ),
        value(CompareOperator::In, keyword("in")),
        value(
            CompareOperator::IsNot,
            tuple((keyword("is"), mws, keyword("not"))),
        ),
        value(CompareOperator::Is, keyword("is")),
    ))(input)
}

// ============================================================================
// Primaries
// ============================================================================

fn primary(input: &str) -> IResult<&str, Expr> {
    alt((
        parenthesized,
        list,
        map(literal, Expr::Literal),
        map(name, Expr::Name),
    ))(input)
}

/// `()` is an empty tuple, `(x)` a group, `(x,)` and `(x, y)` tuples.
fn parenthesized(input: &str) -> IResult<&str, Expr> {
    let (input, _) = pair(char('('), ws)(input)?;

    if let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>(')')(input) {
        return Ok((rest, Expr::Tuple(Vec::new())));
    }

    let (input, first) = or_expr(input)?;
    let (input, others) = many0(preceded(tuple((ws, char(','), ws)), or_expr))(input)?;
    let (input, _) = ws(input)?;
    let (input, trailing) = opt(char(','))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(')')(input)?;

    if others.is_empty() && trailing.is_none() {
        Ok((input, Expr::Nested(Box::new(first))))
    } else {
        let mut items = Vec::with_capacity(others.len() + 1);
        items.push(first);
        items.extend(others);
        Ok((input, Expr::Tuple(items)))
    }
}

fn list(input: &str) -> IResult<&str, Expr> {
    let (input, _) = pair(char('['), ws)(input)?;
    let (input, items) = separated_list0(tuple((ws, char(','), ws)), or_expr)(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = opt(char(','))(input)?;
    let (input, _) = ws(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, Expr::List(items)))
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(string_literal, Literal::Str),
        map(number, |n: &str| Literal::Number(n.to_string())),
        value(Literal::Bool(true), keyword("True")),
        value(Literal::Bool(false), keyword("False")),
        value(Literal::None, keyword("None")),
    ))(input)
}

/// Numeric literal text: decimal integers and floats with optional
/// exponent, `_` digit separators, a leading or trailing dot and a `j`
/// suffix, plus `0x`/`0o`/`0b` integers.
fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('-')),
        alt((radix_integer, decimal)),
    ))(input)
}

fn radix_integer(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        char('0'),
        alt((
            pair(one_of("xX"), many1(preceded(opt(char('_')), hex_digit1))),
            pair(one_of("oO"), many1(preceded(opt(char('_')), oct_digit1))),
            pair(
                one_of("bB"),
                many1(preceded(opt(char('_')), take_while1(|c: char| c == '0' || c == '1'))),
            ),
        )),
    ))(input)
}

fn decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        alt((
            recognize(tuple((digit_part, char('.'), opt(digit_part)))),
            recognize(pair(char('.'), digit_part)),
            digit_part,
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit_part))),
        opt(one_of("jJ")),
    )))(input)
}

/// Digits with single `_` separators between them.
fn digit_part(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, many0(preceded(char('_'), digit1))))(input)
}

fn name(input: &str) -> IResult<&str, String> {
    let (rest, ident) = recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)?;

    if RESERVED.contains(&ident) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((rest, ident.to_string()))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// ============================================================================
// String literals
// ============================================================================

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('\''), quoted('"')))(input)
}

/// Parses a single-line quoted string, resolving backslash escapes.
/// `\N{...}` and malformed `\x`, `\u`, `\U` escapes are rejected;
/// other unrecognized escapes keep their backslash.
fn quoted(quote: char) -> impl FnMut(&str) -> IResult<&str, String> {
    move |input: &str| {
        let (mut rest, _) = char(quote)(input)?;
        let mut out = String::new();

        loop {
            let mut chars = rest.chars();
            match chars.next() {
                Some(c) if c == quote => return Ok((chars.as_str(), out)),
                Some('\\') => {
                    let escape = chars.as_str();
                    match chars.next() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('a') => out.push('\u{7}'),
                        Some('b') => out.push('\u{8}'),
                        Some('f') => out.push('\u{c}'),
                        Some('v') => out.push('\u{b}'),
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some(kind @ ('x' | 'u' | 'U')) => {
                            let len = match kind {
                                'x' => 2,
                                'u' => 4,
                                _ => 8,
                            };
                            let tail = chars.as_str();
                            out.push(hex_escape(tail, len).ok_or_else(|| unterminated(escape))?);
                            chars = tail[len..].chars();
                        }
                        Some('0'..='7') => {
                            let tail = chars.as_str();
                            let extra = tail
                                .chars()
                                .take(2)
                                .take_while(|c| ('0'..='7').contains(c))
                                .count();
                            let code = u32::from_str_radix(&escape[..1 + extra], 8)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| unterminated(escape))?;
                            out.push(code);
                            chars = tail[extra..].chars();
                        }
                        Some('\n') => {}
                        Some('N') | None => return Err(unterminated(escape)),
                        Some(other) => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some('\n') | None => return Err(unterminated(rest)),
                Some(c) => out.push(c),
            }
            rest = chars.as_str();
        }
    }
}

/// Decodes exactly `len` hex digits at the start of `input` as a scalar value.
fn hex_escape(input: &str, len: usize) -> Option<char> {
    let digits = input.get(..len)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}

fn unterminated(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}

// ============================================================================
// Keywords and whitespace
// ============================================================================

/// Matches `word` only when it is not a prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

/// Optional whitespace
fn ws(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

/// Mandatory whitespace
fn mws(input: &str) -> IResult<&str, &str> {
    multispace1(input)
}
