//! Sandboxed arithmetic formula evaluator. A rule's `metric` field may hold, instead of
//! a metric name, a formula string over the fixed numeric namespace — `+ - * /` and
//! parentheses only, no identifiers beyond the namespace, no function calls.

use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    UnexpectedChar(char),
    UnexpectedEnd,
    UnknownIdentifier(String),
    UnbalancedParens,
    TrailingInput(String),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            FormulaError::UnexpectedEnd => write!(f, "unexpected end of formula"),
            FormulaError::UnknownIdentifier(name) => write!(f, "unknown identifier '{name}'"),
            FormulaError::UnbalancedParens => write!(f, "unbalanced parentheses"),
            FormulaError::TrailingInput(rest) => write!(f, "unexpected trailing input '{rest}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<Chars> = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut buf = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        buf.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = buf.parse().map_err(|_| FormulaError::UnexpectedChar('.'))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut buf = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        buf.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(buf));
            }
            other => return Err(FormulaError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Ident(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // term := factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // unary := '-' unary | primary
    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    // primary := NUMBER | IDENT | '(' expr ')'
    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name.clone())),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(FormulaError::UnbalancedParens),
                }
            }
            Some(other) => Err(FormulaError::UnexpectedChar(format!("{other:?}").chars().next().unwrap_or('?'))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

fn eval(expr: &Expr, namespace: &HashMap<String, f64>) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ident(name) => namespace
            .get(name)
            .copied()
            .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone())),
        Expr::Add(a, b) => Ok(eval(a, namespace)? + eval(b, namespace)?),
        Expr::Sub(a, b) => Ok(eval(a, namespace)? - eval(b, namespace)?),
        Expr::Mul(a, b) => Ok(eval(a, namespace)? * eval(b, namespace)?),
        Expr::Div(a, b) => {
            let divisor = eval(b, namespace)?;
            if divisor == 0.0 {
                // Division by zero resolves to 0.0, consistent with the Metric Enricher's
                // zero-spend ROAS rule — never panics, never propagates an error.
                Ok(0.0)
            } else {
                Ok(eval(a, namespace)? / divisor)
            }
        }
        Expr::Neg(a) => Ok(-eval(a, namespace)?),
    }
}

/// Parses and evaluates `formula` against `namespace` in one call.
pub fn evaluate(formula: &str, namespace: &HashMap<String, f64>) -> Result<f64, FormulaError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        let rest: String = formula.chars().skip(parser.pos).collect();
        return Err(FormulaError::TrailingInput(rest));
    }
    eval(&expr, namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> HashMap<String, f64> {
        HashMap::from([
            ("ctr".to_string(), 2.0),
            ("spend".to_string(), 100.0),
            ("conversion_value".to_string(), 0.0),
            ("conversions".to_string(), 5.0),
        ])
    }

    #[test]
    fn evaluates_simple_arithmetic() {
        assert_eq!(evaluate("1 + 2 * 3", &ns()).unwrap(), 7.0);
    }

    #[test]
    fn respects_parentheses() {
        assert_eq!(evaluate("(1 + 2) * 3", &ns()).unwrap(), 9.0);
    }

    #[test]
    fn resolves_identifiers_from_namespace() {
        assert_eq!(evaluate("spend / conversions", &ns()).unwrap(), 20.0);
    }

    #[test]
    fn division_by_zero_yields_zero_not_error() {
        assert_eq!(evaluate("conversion_value / 0", &ns()).unwrap(), 0.0);
    }

    #[test]
    fn unary_minus_is_supported() {
        assert_eq!(evaluate("-ctr + 5", &ns()).unwrap(), 3.0);
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        assert!(matches!(
            evaluate("unknown_metric * 2", &ns()),
            Err(FormulaError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        assert!(matches!(evaluate("(1 + 2", &ns()), Err(FormulaError::UnbalancedParens)));
    }

    #[test]
    fn trailing_input_is_an_error() {
        assert!(matches!(evaluate("1 + 2 3", &ns()), Err(FormulaError::TrailingInput(_))));
    }
}
