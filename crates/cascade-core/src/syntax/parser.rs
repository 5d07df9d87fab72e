//! Recursive-descent parser for the configuration language
//!
//! Produces a [`SourceFile`] of blocks (`cascade`, `stack`, `globals`)
//! whose attributes hold [`Expression`] trees. String literals containing
//! `${...}` decompose into templates; `\${` escapes to a literal `${`.

use indexmap::IndexMap;

use crate::error::{Error, Result, SourceRange};
use crate::expr::{ExprKind, Expression, Reference, Span, TemplatePart};
use crate::syntax::lexer::{Lexer, Token};
use crate::value::Value;

/// A parsed configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path of the file, used in error messages
    pub filename: String,
    pub blocks: Vec<Block>,
}

impl SourceFile {
    /// All top-level blocks with the given name
    pub fn blocks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks.iter().filter(move |b| b.name == name)
    }
}

/// A block: `name "label"... { attributes and nested blocks }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub labels: Vec<String>,
    pub attrs: Vec<Attribute>,
    pub blocks: Vec<Block>,
    pub span: Span,
}

impl Block {
    /// Find an attribute by name
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

/// A named attribute with its expression
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    pub span: Span,
}

/// Parse one configuration file
pub fn parse_file(filename: impl Into<String>, src: &str) -> Result<SourceFile> {
    let filename = filename.into();
    let tokens = Lexer::new(&filename, src).tokens()?;
    let mut parser = Parser {
        filename: filename.clone(),
        tokens,
        pos: 0,
    };
    let blocks = parser.parse_blocks()?;
    Ok(SourceFile { filename, blocks })
}

/// Parse a standalone expression (template interiors)
fn parse_expression_str(filename: &str, src: &str, line: usize, column: usize) -> Result<Expression> {
    let tokens = Lexer::new_at(filename, src, line, column).tokens()?;
    let mut parser = Parser {
        filename: filename.to_string(),
        tokens,
        pos: 0,
    };
    let expr = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

struct Parser {
    filename: String,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn bump(&mut self) -> (Token, Span) {
        let item = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        item
    }

    fn err_at(&self, span: Span, message: impl Into<String>) -> Error {
        Error::syntax(message).with_range(SourceRange {
            file: self.filename.clone(),
            start_line: span.start_line,
            start_column: span.start_column,
            end_line: span.end_line,
            end_column: span.end_column,
        })
    }

    fn expect(&mut self, want: Token) -> Result<Span> {
        let (token, span) = self.bump();
        if token == want {
            Ok(span)
        } else {
            Err(self.err_at(
                span,
                format!("expected {}, found {}", want.describe(), token.describe()),
            ))
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        let (token, span) = self.bump();
        if token == Token::Eof {
            Ok(())
        } else {
            Err(self.err_at(span, format!("unexpected {}", token.describe())))
        }
    }

    /// Parse top-level blocks until EOF
    fn parse_blocks(&mut self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        while *self.peek() != Token::Eof {
            blocks.push(self.parse_block()?);
        }
        Ok(blocks)
    }

    fn parse_block(&mut self) -> Result<Block> {
        let (token, span) = self.bump();
        let Token::Ident(name) = token else {
            return Err(self.err_at(span, format!("expected block name, found {}", token.describe())));
        };

        let mut labels = Vec::new();
        loop {
            match self.peek() {
                Token::StringLit(_) => {
                    let (Token::StringLit(raw), label_span) = self.bump() else {
                        unreachable!()
                    };
                    // labels are plain strings; interpolation makes no sense here
                    match template_to_literal(&raw) {
                        Some(text) => labels.push(text),
                        None => {
                            return Err(
                                self.err_at(label_span, "block labels cannot contain ${...}")
                            )
                        }
                    }
                }
                Token::LBrace => break,
                other => {
                    let other = other.describe();
                    return Err(self.err_at(
                        self.peek_span(),
                        format!("expected '{{' or block label, found {}", other),
                    ));
                }
            }
        }
        self.expect(Token::LBrace)?;

        let mut attrs: Vec<Attribute> = Vec::new();
        let mut blocks = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    let (_, end) = self.bump();
                    return Ok(Block {
                        name,
                        labels,
                        attrs,
                        blocks,
                        span: span.to(end),
                    });
                }
                Token::Eof => {
                    return Err(self.err_at(
                        self.peek_span(),
                        format!("unterminated block \"{}\"", name),
                    ))
                }
                Token::Ident(_) => {
                    let (Token::Ident(item_name), item_span) = self.bump() else {
                        unreachable!()
                    };
                    match self.peek() {
                        Token::Equals => {
                            self.bump();
                            let expr = self.parse_expression()?;
                            if attrs.iter().any(|a| a.name == item_name) {
                                return Err(self.err_at(
                                    item_span,
                                    format!(
                                        "attribute \"{}\" already defined in this block",
                                        item_name
                                    ),
                                ));
                            }
                            let end = expr.span;
                            attrs.push(Attribute {
                                name: item_name,
                                expr,
                                span: item_span.to(end),
                            });
                        }
                        Token::LBrace | Token::StringLit(_) => {
                            // rewind to parse as a nested block
                            self.pos -= 1;
                            blocks.push(self.parse_block()?);
                        }
                        other => {
                            let other = other.describe();
                            return Err(self.err_at(
                                self.peek_span(),
                                format!("expected '=' or '{{' after \"{}\", found {}", item_name, other),
                            ));
                        }
                    }
                }
                other => {
                    let other = other.describe();
                    return Err(self.err_at(
                        self.peek_span(),
                        format!("expected attribute or block, found {}", other),
                    ));
                }
            }
        }
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let (token, span) = self.bump();
        match token {
            Token::Int(i) => Ok(Expression::new(ExprKind::Literal(Value::Integer(i)), span)),
            Token::Float(f) => Ok(Expression::new(ExprKind::Literal(Value::Float(f)), span)),
            Token::StringLit(raw) => self.parse_template(&raw, span),
            Token::LBracket => self.parse_list(span),
            Token::LBrace => self.parse_object(span),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expression::new(ExprKind::Literal(Value::Bool(true)), span)),
                "false" => Ok(Expression::new(ExprKind::Literal(Value::Bool(false)), span)),
                "null" => Ok(Expression::new(ExprKind::Literal(Value::Null), span)),
                _ => {
                    if *self.peek() == Token::LParen {
                        self.parse_call(name, span)
                    } else {
                        self.parse_reference(name, span)
                    }
                }
            },
            other => Err(self.err_at(
                span,
                format!("expected expression, found {}", other.describe()),
            )),
        }
    }

    /// Postfix indexing: `expr[key]` and `.name` access on non-reference
    /// bases (a reference consumes its own dots while parsing)
    fn parse_postfix(&mut self, mut expr: Expression) -> Result<Expression> {
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.bump();
                    let key = self.parse_expression()?;
                    let end = self.expect(Token::RBracket)?;
                    let span = expr.span.to(end);
                    expr = Expression::new(
                        ExprKind::Index {
                            base: Box::new(expr),
                            key: Box::new(key),
                        },
                        span,
                    );
                }
                Token::Dot => {
                    self.bump();
                    let (token, seg_span) = self.bump();
                    let Token::Ident(segment) = token else {
                        return Err(self.err_at(
                            seg_span,
                            format!("expected attribute name after '.', found {}", token.describe()),
                        ));
                    };
                    let span = expr.span.to(seg_span);
                    let key = Expression::new(
                        ExprKind::Literal(Value::String(segment)),
                        seg_span,
                    );
                    expr = Expression::new(
                        ExprKind::Index {
                            base: Box::new(expr),
                            key: Box::new(key),
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_reference(&mut self, root: String, span: Span) -> Result<Expression> {
        let mut path = Vec::new();
        let mut end = span;
        while *self.peek() == Token::Dot {
            self.bump();
            let (token, seg_span) = self.bump();
            let Token::Ident(segment) = token else {
                return Err(self.err_at(
                    seg_span,
                    format!("expected attribute name after '.', found {}", token.describe()),
                ));
            };
            path.push(segment);
            end = seg_span;
        }
        Ok(Expression::new(
            ExprKind::Reference(Reference::new(root, path)),
            span.to(end),
        ))
    }

    fn parse_call(&mut self, name: String, span: Span) -> Result<Expression> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        let end;
        loop {
            if *self.peek() == Token::RParen {
                end = self.bump().1;
                break;
            }
            args.push(self.parse_expression()?);
            match self.peek() {
                Token::Comma => {
                    self.bump();
                }
                Token::RParen => {}
                other => {
                    let other = other.describe();
                    return Err(self.err_at(
                        self.peek_span(),
                        format!("expected ',' or ')' in arguments of {}(), found {}", name, other),
                    ));
                }
            }
        }
        let span = span.to(end);
        // try is an expression form: its arms evaluate lazily
        if name == "try" {
            Ok(Expression::new(ExprKind::Try(args), span))
        } else {
            Ok(Expression::new(ExprKind::Call { name, args }, span))
        }
    }

    fn parse_list(&mut self, start: Span) -> Result<Expression> {
        let mut items = Vec::new();
        loop {
            if *self.peek() == Token::RBracket {
                let (_, end) = self.bump();
                return Ok(Expression::new(ExprKind::List(items), start.to(end)));
            }
            items.push(self.parse_expression()?);
            if *self.peek() == Token::Comma {
                self.bump();
            }
        }
    }

    fn parse_object(&mut self, start: Span) -> Result<Expression> {
        let mut entries: IndexMap<String, Expression> = IndexMap::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    let (_, end) = self.bump();
                    return Ok(Expression::new(ExprKind::Object(entries), start.to(end)));
                }
                Token::Eof => {
                    return Err(self.err_at(self.peek_span(), "unterminated object"));
                }
                _ => {}
            }

            let (token, key_span) = self.bump();
            let key = match token {
                Token::Ident(name) => name,
                Token::StringLit(raw) => template_to_literal(&raw).ok_or_else(|| {
                    self.err_at(key_span, "object keys cannot contain ${...}")
                })?,
                other => {
                    return Err(self.err_at(
                        key_span,
                        format!("expected object key, found {}", other.describe()),
                    ))
                }
            };

            match self.peek() {
                Token::Equals | Token::Colon => {
                    self.bump();
                }
                other => {
                    let other = other.describe();
                    return Err(self.err_at(
                        self.peek_span(),
                        format!("expected '=' after object key \"{}\", found {}", key, other),
                    ));
                }
            }

            let value = self.parse_expression()?;
            if entries.insert(key.clone(), value).is_some() {
                return Err(self.err_at(
                    key_span,
                    format!("object key \"{}\" already defined", key),
                ));
            }

            if *self.peek() == Token::Comma {
                self.bump();
            }
        }
    }

    /// Decompose a raw string literal into a template
    ///
    /// `\${` escapes to a literal `${`; the usual `\n`, `\t`, `\r`,
    /// `\\`, `\"` escapes apply outside interpolations. Returns a plain
    /// string literal when no interpolation is present, and a template
    /// otherwise.
    fn parse_template(&mut self, raw: &str, span: Span) -> Result<Expression> {
        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => literal.push('\n'),
                    Some((_, 't')) => literal.push('\t'),
                    Some((_, 'r')) => literal.push('\r'),
                    Some((_, '\\')) => literal.push('\\'),
                    Some((_, '"')) => literal.push('"'),
                    Some((_, '$')) => literal.push('$'),
                    Some((_, other)) => {
                        literal.push('\\');
                        literal.push(other);
                    }
                    None => literal.push('\\'),
                },
                '$' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next(); // consume '{'
                    let inner = collect_interpolation(&mut chars).ok_or_else(|| {
                        self.err_at(span, "unterminated ${...} in string template")
                    })?;
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    let expr = parse_expression_str(
                        &self.filename,
                        &inner,
                        span.start_line,
                        span.start_column,
                    )?;
                    parts.push(TemplatePart::Expr(expr));
                }
                _ => literal.push(c),
            }
        }

        if parts.is_empty() {
            return Ok(Expression::new(
                ExprKind::Literal(Value::String(literal)),
                span,
            ));
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }
        Ok(Expression::new(ExprKind::Template(parts), span))
    }
}

/// Collect the interior of a `${...}`, tracking nested braces and strings
fn collect_interpolation(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Option<String> {
    let mut inner = String::new();
    let mut depth = 0usize;
    loop {
        let (_, c) = chars.next()?;
        match c {
            '{' => {
                depth += 1;
                inner.push('{');
            }
            '}' if depth == 0 => return Some(inner),
            '}' => {
                depth -= 1;
                inner.push('}');
            }
            '"' => {
                inner.push('"');
                loop {
                    let (_, n) = chars.next()?;
                    inner.push(n);
                    match n {
                        '\\' => {
                            let (_, escaped) = chars.next()?;
                            inner.push(escaped);
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            _ => inner.push(c),
        }
    }
}

/// Render a raw string literal that must not contain interpolation
fn template_to_literal(raw: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('$') => out.push('$'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '$' => {
                if chars.clone().next() == Some('{') {
                    return None;
                }
                out.push('$');
            }
            _ => out.push(c),
        }
    }
    Some(out)
}
