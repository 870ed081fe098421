//! Reader for the chain-expression notation used by the CLI and the tests.
//!
//! The notation covers exactly the shapes the access mutator looks at:
//! identifiers, literals, `.name`, `[args]`, `(args)`, parentheses and the
//! null-conditional forms `?.name`, `?.[args]` and `?[args]`. Trees come out
//! with the same shape a C#-style front end builds: everything after a `?`
//! becomes the continuation of one conditional access, rooted at a binding.

use crate::error::{MutationError, Result};
use crate::syntax::{ArgumentList, ElementBinding, Expr, Identifier, MemberBinding, NodePath, Step};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Deepest nesting of suffixes, groups and argument lists accepted in one
/// expression. Every later stage walks the tree recursively.
pub const MAX_NESTING: usize = 128;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?:(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|(?P<literal>\d+(?:\.\d+)?|"(?:[^"\\]|\\.)*")|(?P<punct>\?\.|[?.\[\](),]))"#,
    )
    .expect("token pattern must compile")
});

static TRAILING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*$").expect("whitespace pattern must compile"));

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Literal(String),
    Question,
    QuestionDot,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
}

/// A token and its byte range in the source
#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Byte ranges of the parsed nodes, shaped like the tree they came from.
///
/// A binding's range starts after the `?`: `.b` for `?.b` and `[i]` for
/// both `?[i]` and `?.[i]`, matching how bindings render on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    span: Range<usize>,
    children: Vec<(Step, SourceMap)>,
}

impl SourceMap {
    fn leaf(span: Range<usize>) -> Self {
        SourceMap {
            span,
            children: Vec::new(),
        }
    }

    fn node(span: Range<usize>, children: Vec<(Step, SourceMap)>) -> Self {
        SourceMap { span, children }
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Range of the node at `path`, if the parse produced one there
    pub fn span_at(&self, path: &NodePath) -> Option<Range<usize>> {
        path.steps()
            .iter()
            .try_fold(self, |map, step| {
                map.children
                    .iter()
                    .find(|(child_step, _)| child_step == step)
                    .map(|(_, child)| child)
            })
            .map(SourceMap::span)
    }
}

type Parsed = (Expr, SourceMap);

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while !TRAILING_SPACE.is_match(&source[offset..]) {
        let rest = &source[offset..];
        let captures = TOKEN_PATTERN
            .captures(rest)
            .ok_or_else(|| MutationError::Parse {
                position: offset + rest.len() - rest.trim_start().len() + 1,
                message: format!(
                    "unexpected character '{}'",
                    rest.trim_start().chars().next().unwrap_or(' ')
                ),
            })?;

        let whole = captures.get(0).map_or(0, |m| m.end());
        let (kind, matched) = if let Some(ident) = captures.name("ident") {
            (TokenKind::Ident(ident.as_str().to_string()), ident)
        } else if let Some(literal) = captures.name("literal") {
            (TokenKind::Literal(literal.as_str().to_string()), literal)
        } else if let Some(punct) = captures.name("punct") {
            let kind = match punct.as_str() {
                "?." => TokenKind::QuestionDot,
                "?" => TokenKind::Question,
                "." => TokenKind::Dot,
                "[" => TokenKind::LBracket,
                "]" => TokenKind::RBracket,
                "(" => TokenKind::LParen,
                ")" => TokenKind::RParen,
                _ => TokenKind::Comma,
            };
            (kind, punct)
        } else {
            return Err(MutationError::Parse {
                position: offset + 1,
                message: "unrecognized token".to_string(),
            });
        };

        tokens.push(Token {
            kind,
            start: offset + matched.start(),
            end: offset + matched.end(),
        });
        offset += whole;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    source_len: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position).map(|t| &t.kind)
    }

    /// Byte offset where the next token starts
    fn next_start(&self) -> usize {
        self.tokens
            .get(self.position)
            .map_or(self.source_len, |t| t.start)
    }

    /// Byte offset just past the last consumed token
    fn last_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.end)
    }

    fn bump(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.position).map(|t| t.kind.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(MutationError::Parse {
            position: self.next_start() + 1,
            message: message.into(),
        })
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return self.error(format!("expression nested deeper than {} levels", MAX_NESTING));
        }
        Ok(())
    }

    fn expect(&mut self, expected: TokenKind, what: &str) -> Result<()> {
        if self.peek() == Some(&expected) {
            self.bump();
            Ok(())
        } else {
            self.error(format!("expected {}", what))
        }
    }

    fn identifier(&mut self) -> Result<Identifier> {
        match self.peek() {
            Some(TokenKind::Ident(_)) => match self.bump() {
                Some(TokenKind::Ident(name)) => Ok(Identifier::new(name)),
                _ => self.error("expected member name"),
            },
            _ => self.error("expected member name"),
        }
    }

    fn expression(&mut self) -> Result<Parsed> {
        self.enter()?;
        let primary = self.primary()?;
        let parsed = self.suffixes(primary)?;
        self.depth -= 1;
        Ok(parsed)
    }

    fn primary(&mut self) -> Result<Parsed> {
        let start = self.next_start();
        match self.bump() {
            Some(TokenKind::Ident(name)) => {
                Ok((Expr::name(name), SourceMap::leaf(start..self.last_end())))
            }
            Some(TokenKind::Literal(text)) => {
                Ok((Expr::opaque(text), SourceMap::leaf(start..self.last_end())))
            }
            Some(TokenKind::LParen) => {
                let (inner, inner_map) = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok((
                    Expr::parenthesized(inner),
                    SourceMap::node(start..self.last_end(), vec![(Step::Inner, inner_map)]),
                ))
            }
            other => {
                if other.is_some() {
                    self.position -= 1;
                }
                self.error("expected an expression")
            }
        }
    }

    fn arguments(
        &mut self,
        close: TokenKind,
        what: &str,
    ) -> Result<(ArgumentList, Vec<(Step, SourceMap)>)> {
        let mut arguments = Vec::new();
        let mut spans = Vec::new();
        if self.peek() == Some(&close) {
            self.bump();
            return Ok((ArgumentList::new(arguments), spans));
        }
        loop {
            let (argument, map) = self.expression()?;
            spans.push((Step::Argument(arguments.len()), map));
            arguments.push(argument);
            match self.peek() {
                Some(TokenKind::Comma) => {
                    self.bump();
                }
                Some(kind) if *kind == close => {
                    self.bump();
                    return Ok((ArgumentList::new(arguments), spans));
                }
                _ => return self.error(format!("expected ',' or {}", what)),
            }
        }
    }

    fn suffixes(&mut self, parsed: Parsed) -> Result<Parsed> {
        let depth = self.depth;
        let result = self.suffix_chain(parsed);
        self.depth = depth;
        result
    }

    /// Every suffix wraps the tree built so far, so each one counts as a
    /// level of nesting
    fn suffix_chain(&mut self, (mut expr, mut map): Parsed) -> Result<Parsed> {
        let start = map.span.start;
        loop {
            match self.peek() {
                Some(TokenKind::Dot) => {
                    self.enter()?;
                    self.bump();
                    let member = self.identifier()?;
                    expr = Expr::member_access(expr, member.0);
                    map = SourceMap::node(start..self.last_end(), vec![(Step::Receiver, map)]);
                }
                Some(TokenKind::LBracket) => {
                    self.enter()?;
                    self.bump();
                    let (arguments, spans) = self.arguments(TokenKind::RBracket, "']'")?;
                    expr = Expr::element_access(expr, arguments.0);
                    let mut children = vec![(Step::Receiver, map)];
                    children.extend(spans);
                    map = SourceMap::node(start..self.last_end(), children);
                }
                Some(TokenKind::LParen) => {
                    self.enter()?;
                    self.bump();
                    let (arguments, spans) = self.arguments(TokenKind::RParen, "')'")?;
                    expr = Expr::invocation(expr, arguments.0);
                    let mut children = vec![(Step::Callee, map)];
                    children.extend(spans);
                    map = SourceMap::node(start..self.last_end(), children);
                }
                Some(TokenKind::Question) | Some(TokenKind::QuestionDot) => {
                    self.enter()?;
                    let binding = self.binding()?;
                    let (continuation, continuation_map) = self.suffix_chain(binding)?;
                    let span = start..continuation_map.span.end;
                    return Ok((
                        Expr::conditional(expr, continuation),
                        SourceMap::node(
                            span,
                            vec![(Step::Receiver, map), (Step::Continuation, continuation_map)],
                        ),
                    ));
                }
                _ => return Ok((expr, map)),
            }
        }
    }

    /// The implicit-receiver access right after `?`
    fn binding(&mut self) -> Result<Parsed> {
        let question_start = self.next_start();
        let dotted = matches!(self.bump(), Some(TokenKind::QuestionDot));
        match self.peek() {
            Some(TokenKind::LBracket) => {
                let start = self.next_start();
                self.bump();
                let (arguments, spans) = self.arguments(TokenKind::RBracket, "']'")?;
                Ok((
                    Expr::ElementBinding(ElementBinding { arguments }),
                    SourceMap::node(start..self.last_end(), spans),
                ))
            }
            Some(TokenKind::Ident(_)) if dotted => {
                // the binding owns the dot of `?.`
                let member = self.identifier()?;
                Ok((
                    Expr::MemberBinding(MemberBinding { member }),
                    SourceMap::leaf(question_start + 1..self.last_end()),
                ))
            }
            _ => self.error("expected member name or '[' after '?'"),
        }
    }
}

/// Parses one expression in chain notation, e.g. `order?.Lines[0].Price`
pub fn parse_expression(source: &str) -> Result<Expr> {
    parse_with_source_map(source).map(|(expr, _)| expr)
}

/// Like [`parse_expression`], also returning where each node sits in
/// `source` so edits can be spliced into the original text
pub fn parse_with_source_map(source: &str) -> Result<(Expr, SourceMap)> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        source_len: source.len(),
        depth: 0,
    };

    let parsed = parser.expression()?;
    if parser.peek().is_some() {
        return parser.error("unexpected trailing input");
    }
    Ok(parsed)
}
