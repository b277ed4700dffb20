//! Lexer and recursive-descent parser for chain expressions such as
//! `return _(data).map('city').sortBy().value();`.

use crate::host::HostError;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Ident(String),
    Member {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Negate(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Identifier(String),
    Number(f64),
    String(String),
    Return,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Minus,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

type ParseResult<T> = Result<T, HostError>;

fn parse_error(message: impl Into<String>) -> HostError {
    HostError::Parse(message.into())
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> String {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            buf.push(ch);
            self.bump();
        }
        buf
    }

    /// Skips whitespace and `//` line comments.
    fn skip_trivia(&mut self) -> ParseResult<()> {
        loop {
            self.consume_while(char::is_whitespace);
            if self.peek() != Some('/') {
                return Ok(());
            }
            self.bump();
            if self.peek() != Some('/') {
                return Err(parse_error("unexpected character '/'"));
            }
            self.consume_while(|c| c != '\n');
        }
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_trivia()?;
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };
        let single = match ch {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            ';' => Some(Token::Semicolon),
            '-' => Some(Token::Minus),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            _ => None,
        };
        if let Some(token) = single {
            self.bump();
            return Ok(token);
        }
        match ch {
            '"' | '\'' => self.string(ch),
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => {
                let ident = self.consume_while(is_ident_part);
                if ident == "return" {
                    Ok(Token::Return)
                } else {
                    Ok(Token::Identifier(ident))
                }
            }
            other => Err(parse_error(format!("unexpected character {other:?}"))),
        }
    }

    fn string(&mut self, quote: char) -> ParseResult<Token> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(parse_error("unterminated string")),
                Some(c) if c == quote => return Ok(Token::String(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => return Err(parse_error("unterminated string")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> ParseResult<Token> {
        let mut text = self.consume_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            text.push('.');
            text.push_str(&self.consume_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.bump();
                text.push(sign);
            }
            let digits = self.consume_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(parse_error(format!("invalid number {text:?}")));
            }
            text.push_str(&digits);
        }
        text.parse()
            .map(Token::Number)
            .map_err(|_| parse_error(format!("invalid number {text:?}")))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Deepest expression tree the parser builds. Evaluation recurses once per
/// level, so this also bounds the evaluator's stack use.
pub const MAX_NESTING: usize = 256;

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            lookahead,
            depth: 0,
        })
    }

    fn bump(&mut self) -> ParseResult<Token> {
        let current = std::mem::replace(&mut self.lookahead, Token::Eof);
        self.lookahead = self.lexer.next_token()?;
        Ok(current)
    }

    fn eat(&mut self, token: &Token) -> ParseResult<bool> {
        if &self.lookahead == token {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.eat(&token)? {
            Ok(())
        } else {
            Err(parse_error(format!(
                "expected {token:?}, found {:?}",
                self.lookahead
            )))
        }
    }

    fn program(&mut self) -> ParseResult<Expr> {
        self.eat(&Token::Return)?;
        if self.lookahead == Token::Eof {
            return Err(parse_error("empty expression"));
        }
        let expr = self.expr()?;
        while self.eat(&Token::Semicolon)? {}
        if self.lookahead != Token::Eof {
            return Err(parse_error(format!("unexpected token {:?}", self.lookahead)));
        }
        Ok(expr)
    }

    /// One level deeper in the tree being built.
    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(parse_error("expression nested too deeply"));
        }
        Ok(())
    }

    fn expr(&mut self) -> ParseResult<Expr> {
        let entry = self.depth;
        let expr = self.nested_expr();
        self.depth = entry;
        expr
    }

    // Negation and every postfix operator wrap the tree built so far, so
    // each one counts as a level.
    fn nested_expr(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        if self.eat(&Token::Minus)? {
            return Ok(Expr::Negate(Box::new(self.expr()?)));
        }
        let mut expr = self.primary()?;
        loop {
            if matches!(
                self.lookahead,
                Token::Dot | Token::LBracket | Token::LParen
            ) {
                self.descend()?;
            }
            if self.eat(&Token::Dot)? {
                let name = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    name,
                };
            } else if self.eat(&Token::LBracket)? {
                let index = self.expr()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::LParen)? {
                let args = self.list(Token::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn property_name(&mut self) -> ParseResult<String> {
        match self.bump()? {
            Token::Identifier(name) => Ok(name),
            Token::Return => Ok("return".to_string()),
            other => Err(parse_error(format!("expected a property name, found {other:?}"))),
        }
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: Token) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.eat(&close)? {
            items.push(self.expr()?);
            if !self.eat(&Token::Comma)? {
                self.expect(close.clone())?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        match self.bump()? {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::String(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Identifier(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                "NaN" => Expr::Literal(Value::Number(f64::NAN)),
                "Infinity" => Expr::Literal(Value::Number(f64::INFINITY)),
                _ => Expr::Ident(name),
            }),
            Token::LParen => {
                self.descend()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                self.descend()?;
                Ok(Expr::Array(self.list(Token::RBracket)?))
            }
            Token::LBrace => {
                self.descend()?;
                self.object()
            }
            other => Err(parse_error(format!("unexpected token {other:?}"))),
        }
    }

    fn object(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        while !self.eat(&Token::RBrace)? {
            let key = match self.bump()? {
                Token::Identifier(name) | Token::String(name) => name,
                Token::Number(n) => crate::value::format_number(n),
                other => return Err(parse_error(format!("expected an object key, found {other:?}"))),
            };
            self.expect(Token::Colon)?;
            entries.push((key, self.expr()?));
            if !self.eat(&Token::Comma)? {
                self.expect(Token::RBrace)?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }
}

pub fn parse(source: &str) -> Result<Expr, HostError> {
    Parser::new(source)?.program()
}
