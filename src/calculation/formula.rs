//! Rule formula parsing and evaluation.
//!
//! Formulas are operator-authored arithmetic over a single bound variable,
//! `base_salary`, e.g. `base_salary * 0.18` or `min(base_salary * 0.1, 5000)`.
//! The grammar admits decimal literals, the bound variable, `+ - * /`,
//! unary minus, parentheses and a fixed whitelist of functions
//! (`min`, `max`, `abs`, `round`). Nothing else can be expressed, so a
//! formula has no way to reach the surrounding program.
//!
//! All arithmetic is done in [`Decimal`] with checked operations. Length,
//! nesting depth and node count are capped when parsing, which bounds the
//! cost of evaluation.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | IDENT | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only variable a formula may reference.
pub const BOUND_VARIABLE: &str = "base_salary";

/// Errors raised while parsing or evaluating a formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("Formula is empty")]
    Empty,

    #[error("Formula is {length} characters long (maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Invalid number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },

    #[error("Unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("Formula nesting exceeds maximum depth ({0})")]
    TooDeep(usize),

    #[error("Formula exceeds maximum size ({0} nodes)")]
    TooComplex(usize),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid rounding precision {0}")]
    InvalidPrecision(Decimal),
}

/// Bounds applied when parsing a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaLimits {
    /// Maximum formula length in characters.
    pub max_length: usize,
    /// Maximum nesting depth of sub-expressions.
    pub max_depth: usize,
    /// Maximum number of AST nodes.
    pub max_nodes: usize,
}

impl Default for FormulaLimits {
    fn default() -> Self {
        Self {
            max_length: 256,
            max_depth: 32,
            max_nodes: 128,
        }
    }
}

/// Whitelisted functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
    Abs,
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Function> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "abs" => Some(Function::Abs),
            "round" => Some(Function::Round),
            _ => None,
        }
    }

    fn check_arity(&self, actual: usize) -> Result<(), FormulaError> {
        let (name, expected, ok) = match self {
            Function::Min => ("min", "at least 1", actual >= 1),
            Function::Max => ("max", "at least 1", actual >= 1),
            Function::Abs => ("abs", "1", actual == 1),
            Function::Round => ("round", "1 or 2", actual == 1 || actual == 2),
        };
        if ok {
            Ok(())
        } else {
            Err(FormulaError::Arity {
                name,
                expected,
                actual,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(Decimal),
    Base,
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let start = i;
        match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '*' => tokens.push((Token::Star, start)),
            '/' => tokens.push((Token::Slash, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            ',' => tokens.push((Token::Comma, start)),
            c if c.is_ascii_digit() || c == '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = Decimal::from_str(&literal).map_err(|_| FormulaError::InvalidNumber {
                    literal: literal.clone(),
                    position: start,
                })?;
                tokens.push((Token::Number(value), start));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push((Token::Ident(name), start));
                continue;
            }
            other => {
                return Err(FormulaError::UnexpectedCharacter {
                    ch: other,
                    position: start,
                });
            }
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    depth: usize,
    nodes: usize,
    limits: FormulaLimits,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, position)) => Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn node(&mut self, expr: Expr) -> Result<Expr, FormulaError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(FormulaError::TooComplex(self.limits.max_nodes));
        }
        Ok(expr)
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(FormulaError::TooDeep(self.limits.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = self.node(Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })?;
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = self.node(Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })?;
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.enter()?;
                let operand = self.unary()?;
                self.leave();
                self.node(Expr::Negate(Box::new(operand)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.enter()?;
                let operand = self.unary()?;
                self.leave();
                Ok(operand)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let (token, position) = self.advance().ok_or(FormulaError::UnexpectedEnd)?;
        match token {
            Token::Number(value) => self.node(Expr::Number(value)),
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    let function = Function::lookup(&name)
                        .ok_or_else(|| FormulaError::UnknownFunction(name.clone()))?;
                    self.advance();
                    self.enter()?;
                    let mut args = vec![self.expr()?];
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.expr()?);
                    }
                    self.expect(Token::RParen)?;
                    self.leave();
                    function.check_arity(args.len())?;
                    self.node(Expr::Call { function, args })
                } else if name == BOUND_VARIABLE {
                    self.node(Expr::Base)
                } else {
                    Err(FormulaError::UnknownIdentifier(name))
                }
            }
            Token::LParen => {
                self.enter()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                self.leave();
                Ok(inner)
            }
            other => Err(FormulaError::UnexpectedToken {
                token: other.to_string(),
                position,
            }),
        }
    }
}

/// A parsed formula, ready to evaluate against any calculation base.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::{Formula, FormulaLimits};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let formula = Formula::parse("base_salary * 0.18", &FormulaLimits::default()).unwrap();
/// let base = Decimal::from_str("22000").unwrap();
/// assert_eq!(formula.evaluate(base).unwrap(), Decimal::from_str("3960").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parses `source`, enforcing `limits`.
    pub fn parse(source: &str, limits: &FormulaLimits) -> Result<Formula, FormulaError> {
        let length = source.chars().count();
        if length > limits.max_length {
            return Err(FormulaError::TooLong {
                length,
                max: limits.max_length,
            });
        }

        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            nodes: 0,
            limits: *limits,
        };
        let expr = parser.expr()?;

        if let Some((token, position)) = parser.advance() {
            return Err(FormulaError::UnexpectedToken {
                token: token.to_string(),
                position,
            });
        }

        Ok(Formula {
            source: source.to_string(),
            expr,
        })
    }

    /// The formula text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the formula with `base_salary` bound to `base`.
    ///
    /// The result is not rounded.
    pub fn evaluate(&self, base: Decimal) -> Result<Decimal, FormulaError> {
        eval(&self.expr, base)
    }
}

/// Parses and evaluates `formula` against `base` with default limits.
pub fn evaluate(formula: &str, base: Decimal) -> Result<Decimal, FormulaError> {
    Formula::parse(formula, &FormulaLimits::default())?.evaluate(base)
}

fn eval(expr: &Expr, base: Decimal) -> Result<Decimal, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Base => Ok(base),
        Expr::Negate(operand) => Ok(-eval(operand, base)?),
        Expr::Binary { op, left, right } => {
            let left = eval(left, base)?;
            let right = eval(right, base)?;
            match op {
                BinaryOp::Add => left.checked_add(right).ok_or(FormulaError::Overflow),
                BinaryOp::Subtract => left.checked_sub(right).ok_or(FormulaError::Overflow),
                BinaryOp::Multiply => left.checked_mul(right).ok_or(FormulaError::Overflow),
                BinaryOp::Divide => {
                    if right.is_zero() {
                        return Err(FormulaError::DivisionByZero);
                    }
                    left.checked_div(right).ok_or(FormulaError::Overflow)
                }
            }
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, base))
                .collect::<Result<Vec<_>, _>>()?;
            match function {
                Function::Min => values
                    .into_iter()
                    .reduce(Ord::min)
                    .ok_or(FormulaError::UnexpectedEnd),
                Function::Max => values
                    .into_iter()
                    .reduce(Ord::max)
                    .ok_or(FormulaError::UnexpectedEnd),
                Function::Abs => Ok(values[0].abs()),
                Function::Round => {
                    let dp = match values.get(1) {
                        Some(precision) => precision_of(*precision)?,
                        None => 0,
                    };
                    Ok(values[0].round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
                }
            }
        }
    }
}

fn precision_of(value: Decimal) -> Result<u32, FormulaError> {
    if !value.fract().is_zero() {
        return Err(FormulaError::InvalidPrecision(value));
    }
    match value.to_u32() {
        Some(dp) if dp <= 28 => Ok(dp),
        _ => Err(FormulaError::InvalidPrecision(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_percentage_of_base() {
        assert_eq!(
            evaluate("base_salary * 0.18", dec("20000")).unwrap(),
            dec("3600")
        );
    }

    #[test]
    fn test_constant_formula_ignores_base() {
        assert_eq!(evaluate("2000", dec("20000")).unwrap(), dec("2000"));
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(evaluate("1 + 2 * 3", Decimal::ZERO).unwrap(), dec("7"));
        assert_eq!(evaluate("(1 + 2) * 3", Decimal::ZERO).unwrap(), dec("9"));
        assert_eq!(evaluate("10 - 4 - 3", Decimal::ZERO).unwrap(), dec("3"));
        assert_eq!(evaluate("24 / 4 / 2", Decimal::ZERO).unwrap(), dec("3"));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(evaluate("-base_salary", dec("5")).unwrap(), dec("-5"));
        assert_eq!(evaluate("2 * -3", Decimal::ZERO).unwrap(), dec("-6"));
        assert_eq!(evaluate("--4", Decimal::ZERO).unwrap(), dec("4"));
    }

    #[test]
    fn test_decimal_arithmetic_has_no_float_drift() {
        assert_eq!(evaluate("0.1 + 0.2", Decimal::ZERO).unwrap(), dec("0.3"));
    }

    #[test]
    fn test_whitelisted_functions() {
        assert_eq!(
            evaluate("min(base_salary * 0.1, 1500)", dec("20000")).unwrap(),
            dec("1500")
        );
        assert_eq!(evaluate("max(0, base_salary - 25000)", dec("20000")).unwrap(), dec("0"));
        assert_eq!(evaluate("abs(0 - 12.5)", Decimal::ZERO).unwrap(), dec("12.5"));
        assert_eq!(evaluate("round(base_salary / 3, 2)", dec("100")).unwrap(), dec("33.33"));
        assert_eq!(evaluate("round(2.5)", Decimal::ZERO).unwrap(), dec("3"));
    }

    #[test]
    fn test_unknown_identifier_is_rejected() {
        assert_eq!(
            evaluate("gross_salary * 0.18", dec("1")),
            Err(FormulaError::UnknownIdentifier("gross_salary".to_string()))
        );
    }

    #[test]
    fn test_attribute_access_is_rejected() {
        assert!(evaluate("base_salary.__class__", dec("1")).is_err());
    }

    #[test]
    fn test_arbitrary_calls_are_rejected() {
        assert_eq!(
            evaluate("open(1)", dec("1")),
            Err(FormulaError::UnknownFunction("open".to_string()))
        );
        assert!(matches!(
            evaluate("__import__('os')", dec("1")),
            Err(FormulaError::UnknownFunction(_)) | Err(FormulaError::UnexpectedCharacter { .. })
        ));
    }

    #[test]
    fn test_unexpected_characters_are_rejected() {
        assert_eq!(
            evaluate("base_salary ** 2", dec("1")),
            Err(FormulaError::UnexpectedToken {
                token: "*".to_string(),
                position: 13,
            })
        );
        assert_eq!(
            evaluate("base_salary; 1", dec("1")),
            Err(FormulaError::UnexpectedCharacter {
                ch: ';',
                position: 11,
            })
        );
    }

    #[test]
    fn test_malformed_formulas() {
        assert_eq!(evaluate("", dec("1")), Err(FormulaError::Empty));
        assert_eq!(evaluate("   ", dec("1")), Err(FormulaError::Empty));
        assert_eq!(evaluate("base_salary *", dec("1")), Err(FormulaError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2", dec("1")), Err(FormulaError::UnexpectedEnd));
        assert!(matches!(
            evaluate("1 2", dec("1")),
            Err(FormulaError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            evaluate("1..2", dec("1")),
            Err(FormulaError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_function_arity_is_checked() {
        assert_eq!(
            evaluate("abs(1, 2)", dec("1")),
            Err(FormulaError::Arity {
                name: "abs",
                expected: "1",
                actual: 2,
            })
        );
        assert!(matches!(
            evaluate("round(1, 2, 3)", dec("1")),
            Err(FormulaError::Arity { name: "round", .. })
        ));
    }

    #[test]
    fn test_invalid_rounding_precision() {
        assert_eq!(
            evaluate("round(1.234, 0.5)", dec("1")),
            Err(FormulaError::InvalidPrecision(dec("0.5")))
        );
        assert_eq!(
            evaluate("round(1.234, -1)", dec("1")),
            Err(FormulaError::InvalidPrecision(dec("-1")))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate("base_salary / 0", dec("1")),
            Err(FormulaError::DivisionByZero)
        );
        assert_eq!(
            evaluate("1 / (base_salary - 100)", dec("100")),
            Err(FormulaError::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            evaluate("base_salary * base_salary", Decimal::MAX),
            Err(FormulaError::Overflow)
        );
    }

    #[test]
    fn test_length_limit() {
        let limits = FormulaLimits {
            max_length: 10,
            ..FormulaLimits::default()
        };
        assert_eq!(
            Formula::parse("base_salary * 2", &limits),
            Err(FormulaError::TooLong {
                length: 15,
                max: 10,
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let limits = FormulaLimits {
            max_depth: 3,
            ..FormulaLimits::default()
        };
        assert!(Formula::parse("((1))", &limits).is_ok());
        assert_eq!(
            Formula::parse("((((1))))", &limits),
            Err(FormulaError::TooDeep(3))
        );
    }

    #[test]
    fn test_node_limit() {
        let limits = FormulaLimits {
            max_nodes: 5,
            ..FormulaLimits::default()
        };
        assert!(Formula::parse("1 + 2 + 3", &limits).is_ok());
        assert_eq!(
            Formula::parse("1 + 2 + 3 + 4", &limits),
            Err(FormulaError::TooComplex(5))
        );
    }

    #[test]
    fn test_parsed_formula_is_reusable_and_deterministic() {
        let formula = Formula::parse("base_salary * 0.015", &FormulaLimits::default()).unwrap();
        assert_eq!(formula.source(), "base_salary * 0.015");
        let first = formula.evaluate(dec("22000")).unwrap();
        let second = formula.evaluate(dec("22000")).unwrap();
        assert_eq!(first, dec("330"));
        assert_eq!(first, second);
        assert_eq!(formula.evaluate(dec("20000")).unwrap(), dec("300"));
    }
}
