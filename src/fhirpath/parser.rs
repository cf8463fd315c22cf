use crate::error::{ReferoError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Bare identifier: the response root type name or a member of the focus.
    Identifier(String),
    /// `target.member`
    Member(Box<Expr>, String),
    /// `target.name(args)` or bare `name(args)` against the current focus.
    Function {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Negate(Box<Expr>),
}

pub fn parse(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        Token::End => Ok(expr),
        other => Err(ReferoError::parse(format!(
            "unexpected trailing input near {other:?}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Integer(i64),
    Decimal(f64),
    String(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    True,
    False,
    End,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
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
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ne);
                } else {
                    return Err(ReferoError::parse("expected '=' after '!'"));
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
            '>' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some('\\') => match chars.next() {
                            Some('\'') => value.push('\''),
                            Some('\\') => value.push('\\'),
                            Some(other) => value.push(other),
                            None => {
                                return Err(ReferoError::parse("unterminated string literal"))
                            }
                        },
                        Some(other) => value.push(other),
                        None => return Err(ReferoError::parse("unterminated string literal")),
                    }
                }
                tokens.push(Token::String(value));
            }
            '0'..='9' => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // A dot is only part of the number when a digit follows;
                // otherwise it is a path separator (e.g. `1.toString()`).
                let mut lookahead = chars.clone();
                if lookahead.next() == Some('.')
                    && lookahead.peek().is_some_and(|d| d.is_ascii_digit())
                {
                    number.push('.');
                    chars.next();
                    while let Some(&d) = chars.peek() {
                        if d.is_ascii_digit() {
                            number.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let value = number
                        .parse::<f64>()
                        .map_err(|e| ReferoError::parse(format!("bad decimal: {e}")))?;
                    tokens.push(Token::Decimal(value));
                } else {
                    let value = number
                        .parse::<i64>()
                        .map_err(|e| ReferoError::parse(format!("bad integer: {e}")))?;
                    tokens.push(Token::Integer(value));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        word.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Identifier(word),
                });
            }
            other => {
                return Err(ReferoError::parse(format!(
                    "unexpected character '{other}'"
                )));
            }
        }
    }

    tokens.push(Token::End);
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            Err(ReferoError::parse(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.equality()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr> {
        let lhs = self.relational()?;
        let op = match self.peek() {
            Token::Eq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.relational()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn relational(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.additive()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if *self.peek() == Token::Minus {
            self.advance();
            let expr = self.unary()?;
            return Ok(Expr::Negate(Box::new(expr)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while *self.peek() == Token::Dot {
            self.advance();
            let name = match self.advance() {
                Token::Identifier(name) => name,
                other => {
                    return Err(ReferoError::parse(format!(
                        "expected member name after '.', found {other:?}"
                    )));
                }
            };
            if *self.peek() == Token::LParen {
                let args = self.arguments()?;
                expr = Expr::Function {
                    target: Some(Box::new(expr)),
                    name,
                    args,
                };
            } else {
                expr = Expr::Member(Box::new(expr), name);
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::Integer(value) => Ok(Expr::Literal(Literal::Integer(value))),
            Token::Decimal(value) => Ok(Expr::Literal(Literal::Decimal(value))),
            Token::String(value) => Ok(Expr::Literal(Literal::String(value))),
            Token::True => Ok(Expr::Literal(Literal::Boolean(true))),
            Token::False => Ok(Expr::Literal(Literal::Boolean(false))),
            Token::LParen => {
                let expr = self.or_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Identifier(name) => {
                if *self.peek() == Token::LParen {
                    let args = self.arguments()?;
                    Ok(Expr::Function {
                        target: None,
                        name,
                        args,
                    })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            other => Err(ReferoError::parse(format!(
                "unexpected token {other:?}"
            ))),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if *self.peek() == Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.or_expr()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                other => {
                    return Err(ReferoError::parse(format!(
                        "expected ',' or ')' in argument list, found {other:?}"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_chain() {
        let expr = parse("QuestionnaireResponse.descendants().where(linkId='a').answer.value")
            .unwrap();
        match expr {
            Expr::Member(inner, name) => {
                assert_eq!(name, "value");
                assert!(matches!(*inner, Expr::Member(_, _)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => assert!(matches!(
                *rhs,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse("where(linkId='oops").is_err());
    }

    #[test]
    fn integer_member_access_is_not_a_decimal() {
        // `value.first()` after an integer literal keeps the dot as a separator.
        assert!(parse("1.exists()").is_ok());
    }
}
