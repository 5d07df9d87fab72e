//! Token scanner for the configuration language
//!
//! A hand-written peek/bump scanner tracking line and column. String
//! literals are captured raw, with `${...}` interpolations and escape
//! sequences left untouched; the parser decomposes templates.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{Error, Result, SourceRange};
use crate::expr::Span;

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// Raw string contents between the quotes, escapes unprocessed
    StringLit(String),
    Int(i64),
    Float(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    Equals,
    Colon,
    Eof,
}

impl Token {
    /// Human form used in parse error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier \"{}\"", name),
            Token::StringLit(_) => "string literal".to_string(),
            Token::Int(i) => format!("number {}", i),
            Token::Float(f) => format!("number {}", f),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    file: String,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: impl Into<String>, src: &'a str) -> Self {
        Self {
            input: src.chars().peekable(),
            file: file.into(),
            line: 1,
            column: 1,
        }
    }

    /// Start the scanner at an explicit position (used for template
    /// sub-expressions so their spans land inside the enclosing string)
    pub fn new_at(file: impl Into<String>, src: &'a str, line: usize, column: usize) -> Self {
        Self {
            input: src.chars().peekable(),
            file: file.into(),
            line,
            column,
        }
    }

    /// Tokenize the whole input
    pub fn tokens(mut self) -> Result<Vec<(Token, Span)>> {
        let mut out = Vec::new();
        loop {
            let (token, span) = self.next_token()?;
            let done = token == Token::Eof;
            out.push((token, span));
            if done {
                return Ok(out);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.input.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn here(&self) -> Span {
        Span::point(self.line, self.column)
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::syntax(message).with_range(SourceRange::new(&self.file, self.line, self.column))
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => self.skip_line(),
                '/' => {
                    // only a comment if followed by another slash
                    let mut probe = self.input.clone();
                    probe.next();
                    if probe.peek() == Some(&'/') {
                        self.skip_line();
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                return;
            }
        }
    }

    fn next_token(&mut self) -> Result<(Token, Span)> {
        self.skip_trivia();
        let start = self.here();

        let Some(c) = self.peek() else {
            return Ok((Token::Eof, start));
        };

        let token = match c {
            '{' => self.symbol(Token::LBrace),
            '}' => self.symbol(Token::RBrace),
            '[' => self.symbol(Token::LBracket),
            ']' => self.symbol(Token::RBracket),
            '(' => self.symbol(Token::LParen),
            ')' => self.symbol(Token::RParen),
            ',' => self.symbol(Token::Comma),
            '.' => self.symbol(Token::Dot),
            '=' => self.symbol(Token::Equals),
            ':' => self.symbol(Token::Colon),
            '"' => self.scan_string()?,
            '-' => self.scan_number()?,
            c if c.is_ascii_digit() => self.scan_number()?,
            c if c.is_alphabetic() || c == '_' => self.scan_ident(),
            c => return Err(self.err(format!("unexpected character '{}'", c))),
        };

        let end = Span::point(self.line, self.column.saturating_sub(1).max(1));
        Ok((token, start.to(end)))
    }

    fn symbol(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn scan_ident(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }

    fn scan_number(&mut self) -> Result<Token> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.err("expected digit after '-'"));
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        // A '.' only continues the number when a digit follows; otherwise
        // it is an index/attribute dot and belongs to the parser.
        let mut is_float = false;
        if self.peek() == Some('.') {
            let mut probe = self.input.clone();
            probe.next();
            if matches!(probe.peek(), Some(d) if d.is_ascii_digit()) {
                is_float = true;
                text.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            let f: f64 = text
                .parse()
                .map_err(|_| self.err(format!("invalid number \"{}\"", text)))?;
            Ok(Token::Float(f))
        } else {
            let i: i64 = text
                .parse()
                .map_err(|_| self.err(format!("number \"{}\" does not fit an integer", text)))?;
            Ok(Token::Int(i))
        }
    }

    /// Capture a string literal raw
    ///
    /// `${...}` interiors may contain nested strings and braces; brace
    /// depth and nested quotes are tracked so the closing quote of the
    /// outer literal is found correctly.
    fn scan_string(&mut self) -> Result<Token> {
        self.bump(); // opening quote
        let mut raw = String::new();
        let mut depth = 0usize;

        loop {
            let Some(c) = self.bump() else {
                return Err(self.err("unterminated string literal"));
            };
            match c {
                '\\' => {
                    raw.push('\\');
                    match self.bump() {
                        Some(escaped) => raw.push(escaped),
                        None => return Err(self.err("unterminated string literal")),
                    }
                }
                '$' if self.peek() == Some('{') => {
                    raw.push('$');
                    raw.push('{');
                    self.bump();
                    depth += 1;
                }
                '{' if depth > 0 => {
                    raw.push('{');
                    depth += 1;
                }
                '}' if depth > 0 => {
                    raw.push('}');
                    depth -= 1;
                }
                '"' if depth == 0 => break,
                '"' => {
                    // nested string inside an interpolation
                    raw.push('"');
                    loop {
                        let Some(n) = self.bump() else {
                            return Err(self.err("unterminated string literal"));
                        };
                        raw.push(n);
                        match n {
                            '\\' => match self.bump() {
                                Some(escaped) => raw.push(escaped),
                                None => return Err(self.err("unterminated string literal")),
                            },
                            '"' => break,
                            _ => {}
                        }
                    }
                }
                '\n' => return Err(self.err("unterminated string literal")),
                _ => raw.push(c),
            }
        }

        Ok(Token::StringLit(raw))
    }
}
