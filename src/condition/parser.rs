//! Recursive-descent parser for edge-condition expressions.
//!
//! Grammar (lowest precedence first):
//!   or    := and ("||" and)*
//!   and   := cmp ("&&" cmp)*
//!   cmp   := unary (("==" | "!=" | ">" | ">=" | "<" | "<=") unary)?
//!   unary := "!" unary | primary
//!   primary := number | "true" | "false" | "null" | string | ident | "(" or ")"

use super::ast::{Expression, Value};
use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Text(String),
    True,
    False,
    Null,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Eq);
                } else {
                    return Err(ExprError::Parse {
                        expression: input.to_string(),
                        reason: "single '=' is not an operator, use '=='".to_string(),
                    });
                }
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '<' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::And);
                } else {
                    return Err(ExprError::Parse {
                        expression: input.to_string(),
                        reason: "single '&' is not an operator, use '&&'".to_string(),
                    });
                }
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_some() {
                    tokens.push(Token::Or);
                } else {
                    return Err(ExprError::Parse {
                        expression: input.to_string(),
                        reason: "single '|' is not an operator, use '||'".to_string(),
                    });
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => {
                            return Err(ExprError::Parse {
                                expression: input.to_string(),
                                reason: "unterminated string literal".to_string(),
                            });
                        }
                    }
                }
                tokens.push(Token::Text(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed = num.parse::<f64>().map_err(|_| ExprError::Parse {
                    expression: input.to_string(),
                    reason: format!("invalid number '{}'", num),
                })?;
                tokens.push(Token::Number(parsed));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '.' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ident.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
            other => {
                return Err(ExprError::Parse {
                    expression: input.to_string(),
                    reason: format!("unexpected character '{}'", other),
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn err(&self, reason: impl Into<String>) -> ExprError {
        ExprError::Parse {
            expression: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn parse_or(&mut self) -> Result<Expression, ExprError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ExprError> {
        let mut left = self.parse_cmp()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_cmp()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expression, ExprError> {
        let left = self.parse_unary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(Token::Eq),
            Some(Token::Ne) => Some(Token::Ne),
            Some(Token::Gt) => Some(Token::Gt),
            Some(Token::Ge) => Some(Token::Ge),
            Some(Token::Lt) => Some(Token::Lt),
            Some(Token::Le) => Some(Token::Le),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_unary()?;
        let (l, r) = (Box::new(left), Box::new(right));
        Ok(match op {
            Token::Eq => Expression::Equal(l, r),
            Token::Ne => Expression::NotEqual(l, r),
            Token::Gt => Expression::GreaterThan(l, r),
            Token::Ge => Expression::GreaterThanOrEqual(l, r),
            Token::Lt => Expression::LessThan(l, r),
            Token::Le => Expression::LessThanOrEqual(l, r),
            _ => unreachable!(),
        })
    }

    fn parse_unary(&mut self) -> Result<Expression, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ExprError> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expression::Literal(Value::Number(n))),
            Some(Token::Text(s)) => Ok(Expression::Literal(Value::Text(s))),
            Some(Token::True) => Ok(Expression::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expression::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expression::Literal(Value::Null)),
            Some(Token::Ident(name)) => Ok(Expression::Binding(name)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.advance() != Some(&Token::RParen) {
                    return Err(self.err("expected ')'"));
                }
                Ok(inner)
            }
            Some(other) => Err(self.err(format!("unexpected token {:?}", other))),
            None => Err(self.err("unexpected end of expression")),
        }
    }
}

/// Parse a condition expression such as `perform_weighing == true` or
/// `volume > 10 && direction == 'forward'`.
pub fn parse(input: &str) -> Result<Expression, ExprError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExprError::Parse {
            expression: input.to_string(),
            reason: "empty expression".to_string(),
        });
    }
    let tokens = tokenize(trimmed)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, input: trimmed };
    let expr = parser.parse_or()?;
    if parser.pos != tokens.len() {
        return Err(parser.err("trailing tokens after expression"));
    }
    Ok(expr)
}
