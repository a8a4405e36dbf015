//! Tiny expression language used by `select` and `calculate` steps.
//!
//! Predicates: `field OP literal` with OP in {==, !=, <, <=, >, >=}, clauses
//! joined by `&&`. Literals may be quoted; an unquoted `null` is the null value.
//!
//! Arithmetic: `operand [OP operand]` with OP in {+, -, *, /}; operands are
//! field names or numbers.
//!
//! Parsing is schema-free. Binding against a schema resolves field positions
//! and coerces each literal with the field's own coercion rule, so
//! `when >= 2021-01-01` compares epoch milliseconds on a temporal field.

use std::cmp::Ordering;

use datamodel_core::prelude::{Error, Row, Scalar, Schema};
use datamodel_core::types::scalar_cmp;

use crate::error::{PlanError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    // Two-character operators first so `<=` is not read as `<`.
    const TOKENS: [(&'static str, CmpOp); 6] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: CmpOp,
    /// Literal text with quotes removed.
    pub literal: String,
    /// An unquoted `null`.
    pub null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub clauses: Vec<Comparison>,
}

/// Parse `"a > 3 && b == 'x'"`.
pub fn parse_predicate(expr: &str) -> Result<Predicate> {
    let mut clauses = Vec::new();
    let mut rest = expr;
    while let Some(pos) = find_unquoted(rest, "&&") {
        clauses.push(parse_comparison(&rest[..pos])?);
        rest = &rest[pos + 2..];
    }
    clauses.push(parse_comparison(rest)?);
    Ok(Predicate { clauses })
}

/// Byte offset of the first `pat` outside a quoted literal.
fn find_unquoted(s: &str, pat: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if s[i..].starts_with(pat) => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_comparison(clause: &str) -> Result<Comparison> {
    for (token, op) in CmpOp::TOKENS {
        if let Some(pos) = find_unquoted(clause, token) {
            let field = clause[..pos].trim();
            let raw = clause[pos + token.len()..].trim();
            if field.is_empty() || raw.is_empty() {
                break;
            }
            let (literal, quoted) = unquote(raw);
            return Ok(Comparison {
                field: field.to_string(),
                op,
                literal: literal.to_string(),
                null: !quoted && literal == "null",
            });
        }
    }
    Err(PlanError::Invalid(format!(
        "unparseable predicate: '{}'",
        clause.trim()
    )))
}

fn unquote(raw: &str) -> (&str, bool) {
    for q in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(q) && raw.ends_with(q) {
            return (&raw[1..raw.len() - 1], true);
        }
    }
    (raw, false)
}

/// A predicate resolved against one schema.
#[derive(Debug, Clone)]
pub struct BoundPredicate {
    clauses: Vec<(usize, CmpOp, Scalar)>,
}

impl Predicate {
    pub fn bind(
        &self,
        schema: &Schema,
        temporal_format: &str,
    ) -> datamodel_core::Result<BoundPredicate> {
        let clauses = self
            .clauses
            .iter()
            .map(|c| {
                let pos = schema
                    .index_of(&c.field)
                    .ok_or_else(|| Error::unknown_field(c.field.clone()))?;
                let literal = if c.null {
                    Scalar::Null
                } else {
                    let coerced = schema.fields[pos]
                        .coerce(Scalar::Str(c.literal.clone()), temporal_format);
                    if coerced.is_null() {
                        return Err(Error::Build(format!(
                            "'{}' is not a valid value for field '{}'",
                            c.literal, c.field
                        )));
                    }
                    coerced
                };
                Ok((pos, c.op, literal))
            })
            .collect::<datamodel_core::Result<Vec<_>>>()?;
        Ok(BoundPredicate { clauses })
    }
}

impl BoundPredicate {
    pub fn eval(&self, row: &Row<'_>) -> bool {
        self.clauses
            .iter()
            .all(|(pos, op, literal)| compare(row.at(*pos), *op, literal))
    }
}

/// Comparisons against null only answer `==`/`!=`; ordering with null is false.
fn compare(value: &Scalar, op: CmpOp, literal: &Scalar) -> bool {
    if value.is_null() || literal.is_null() {
        let both = value.is_null() && literal.is_null();
        return match op {
            CmpOp::Eq => both,
            CmpOp::Ne => !both,
            _ => false,
        };
    }
    match op {
        CmpOp::Eq => value.key_eq(literal),
        CmpOp::Ne => !value.key_eq(literal),
        CmpOp::Lt => scalar_cmp(value, literal) == Ordering::Less,
        CmpOp::Le => scalar_cmp(value, literal) != Ordering::Greater,
        CmpOp::Gt => scalar_cmp(value, literal) == Ordering::Greater,
        CmpOp::Ge => scalar_cmp(value, literal) != Ordering::Less,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arithmetic {
    pub lhs: Operand,
    pub rhs: Option<(ArithOp, Operand)>,
}

/// Parse `"sales * 2"`, `"a - b"` or a single operand.
pub fn parse_arithmetic(expr: &str) -> Result<Arithmetic> {
    let expr = expr.trim();
    // Skip index 0 so a leading sign belongs to the number.
    let split = expr.char_indices().skip(1).find_map(|(i, c)| {
        let op = match c {
            '+' => ArithOp::Add,
            '-' => ArithOp::Sub,
            '*' => ArithOp::Mul,
            '/' => ArithOp::Div,
            _ => return None,
        };
        Some((i, op))
    });
    match split {
        Some((i, op)) => Ok(Arithmetic {
            lhs: parse_operand(&expr[..i])?,
            rhs: Some((op, parse_operand(&expr[i + 1..])?)),
        }),
        None => Ok(Arithmetic {
            lhs: parse_operand(expr)?,
            rhs: None,
        }),
    }
}

fn parse_operand(s: &str) -> Result<Operand> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return Ok(Operand::Number(v));
    }
    if s.is_empty() || s.contains(char::is_whitespace) {
        return Err(PlanError::Invalid(format!("bad operand '{s}'")));
    }
    Ok(Operand::Field(s.to_string()))
}

#[derive(Debug, Clone)]
enum BoundOperand {
    Field(usize),
    Number(f64),
}

impl BoundOperand {
    fn value(&self, row: &Row<'_>) -> Scalar {
        match self {
            BoundOperand::Field(pos) => row.at(*pos).clone(),
            BoundOperand::Number(v) => Scalar::F64(*v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundArithmetic {
    lhs: BoundOperand,
    rhs: Option<(ArithOp, BoundOperand)>,
}

impl Arithmetic {
    pub fn bind(&self, schema: &Schema) -> datamodel_core::Result<BoundArithmetic> {
        let bind = |op: &Operand| match op {
            Operand::Number(v) => Ok(BoundOperand::Number(*v)),
            Operand::Field(name) => schema
                .index_of(name)
                .map(BoundOperand::Field)
                .ok_or_else(|| Error::unknown_field(name.clone())),
        };
        Ok(BoundArithmetic {
            lhs: bind(&self.lhs)?,
            rhs: match &self.rhs {
                Some((op, operand)) => Some((*op, bind(operand)?)),
                None => None,
            },
        })
    }
}

impl BoundArithmetic {
    /// Non-numeric operands and division by zero give `Null`.
    pub fn eval(&self, row: &Row<'_>) -> Scalar {
        let lhs = self.lhs.value(row);
        let Some((op, rhs)) = &self.rhs else {
            return lhs;
        };
        let (Some(a), Some(b)) = (lhs.as_f64(), rhs.value(row).as_f64()) else {
            return Scalar::Null;
        };
        match op {
            ArithOp::Add => Scalar::F64(a + b),
            ArithOp::Sub => Scalar::F64(a - b),
            ArithOp::Mul => Scalar::F64(a * b),
            ArithOp::Div if b == 0.0 => Scalar::Null,
            ArithOp::Div => Scalar::F64(a / b),
        }
    }
}
