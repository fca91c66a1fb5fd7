//! Document Driver
//!
//! A stream holds zero or more documents. Each document starts with an
//! optional header (at most one `%YAML 1.1` or `%YAML 1.2` directive, then
//! `---`) and may end with `...`. A directive must be followed by `---`.

use log::debug;

use crate::context::{Anchors, ParseContext};
use crate::error::{ParseError, Result};
use crate::lexer::{Token, TokenKind};
use crate::options::{AnchorScope, ParseOptions};
use crate::parser::parse_value;
use crate::value::Value;

const VERSIONS: [&str; 2] = ["1.1", "1.2"];

/// Consume the document header.
fn parse_header(mut ctx: ParseContext<'_>) -> Result<ParseContext<'_>> {
    let mut yaml_allowed = true;
    loop {
        match ctx.peek_kind() {
            kind if kind.is_space() => ctx = ctx.advance(),
            TokenKind::Directive => {
                ctx.guard(yaml_allowed, ParseError::DuplicateDirective)?;
                ctx = ctx.advance().expect(TokenKind::Space, "space")?;
                let version = ctx.peek_text();
                ctx.guard(VERSIONS.contains(&version), |near| {
                    ParseError::InvalidVersion(version.to_string(), near)
                })?;
                ctx = ctx.advance();
                yaml_allowed = false;
            }
            TokenKind::DocStart => return Ok(ctx.advance()),
            _ => {
                ctx.guard(yaml_allowed, |near| ParseError::Expected("---", near))?;
                return Ok(ctx);
            }
        }
    }
}

/// Parse header and value of one document. The returned context is past
/// any trailing spaces and `...` markers.
fn parse_document(ctx: ParseContext<'_>) -> Result<(ParseContext<'_>, Value)> {
    let ctx = parse_header(ctx)?;
    let (ctx, value) = parse_value(ctx)?;
    Ok((ctx.skip_doc_end(), value))
}

/// Parse a token stream holding exactly one document.
pub fn parse_single(tokens: &[Token]) -> Result<Value> {
    let (ctx, value) = parse_document(ParseContext::new(tokens))?;
    ctx.expect(TokenKind::End, "end")?;
    Ok(value)
}

/// Iterator over the documents of a stream.
///
/// Yields one result per document and stops after the first error, so the
/// documents before a failing one are still delivered.
#[derive(Debug)]
pub struct Documents {
    tokens: Vec<Token>,
    pos: usize,
    anchors: Anchors,
    options: ParseOptions,
    count: usize,
    done: bool,
}

impl Documents {
    pub fn new(tokens: Vec<Token>, options: &ParseOptions) -> Self {
        Self {
            tokens,
            pos: 0,
            anchors: Anchors::default(),
            options: options.clone(),
            count: 0,
            done: false,
        }
    }

    fn next_document(&mut self) -> Option<Result<Value>> {
        let ctx = ParseContext::resume(&self.tokens, self.pos, self.anchors.clone());
        let ctx = match self.options.anchor_scope {
            AnchorScope::Document => ctx.without_anchors(),
            AnchorScope::Stream => ctx,
        };
        if ctx.clone().skip_space().peek_kind() == TokenKind::End {
            return None;
        }
        debug!("parsing document {} at token {}", self.count, self.pos);

        let start = ctx.position();
        let (ctx, value) = match parse_document(ctx) {
            Ok(parsed) => parsed,
            Err(err) => return Some(Err(err)),
        };
        // A document that consumes nothing would be parsed again forever.
        if ctx.position() == start {
            return Some(Err(ParseError::UnexpectedToken(ctx.peek_kind(), ctx.near())));
        }
        self.pos = ctx.position();
        self.anchors = ctx.anchors().clone();
        self.count += 1;
        Some(Ok(value))
    }
}

impl Iterator for Documents {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_document();
        match &item {
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                debug!("document {} failed: {}", self.count, err);
                self.done = true;
            }
            None => {
                debug!("parsed {} documents", self.count);
                self.done = true;
            }
        }
        item.map(|result| match &self.options.source_name {
            Some(name) => result.map_err(|err| err.with_source(name)),
            None => result,
        })
    }
}
