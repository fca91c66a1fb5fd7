//! Parse context: a cursor over the token stream plus the anchor table.
//!
//! Every parsing step takes a context by value and returns the context for
//! the next step, so a failed step never leaves a half-advanced cursor
//! behind. The anchor table is shared between contexts and copied only
//! when a new anchor is registered.
//!
//! The context also enforces two limits: how deeply values may nest, and
//! how many nodes aliases may copy in one document.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Near, ParseError, Result, CONTEXT_CHARS};
use crate::lexer::{Token, TokenKind};
use crate::value::Value;

static END: Token = Token {
    kind: TokenKind::End,
    text: String::new(),
};

/// Anchor name to value.
pub type Anchors = Arc<HashMap<String, Value>>;

/// Deepest allowed nesting of values, counting aliased content.
pub const MAX_DEPTH: usize = 128;

/// Nodes aliases may copy per token of input.
const ALIAS_NODES_PER_TOKEN: usize = 100;

/// Nodes aliases may always copy, however short the input.
const MIN_ALIAS_NODES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ParseContext<'t> {
    tokens: &'t [Token],
    pos: usize,
    anchors: Anchors,
    depth: usize,
    expanded: usize,
}

impl<'t> ParseContext<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self::resume(tokens, 0, Anchors::default())
    }

    /// A context starting at `pos` with an existing anchor table.
    pub fn resume(tokens: &'t [Token], pos: usize, anchors: Anchors) -> Self {
        Self {
            tokens,
            pos,
            anchors,
            depth: 0,
            expanded: 0,
        }
    }

    /// Index of the current token.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn anchors(&self) -> &Anchors {
        &self.anchors
    }

    /// Number of values currently being parsed around this position.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Enter a nested value, or fail past [`MAX_DEPTH`].
    pub fn descend(mut self) -> Result<Self> {
        self.guard(self.depth < MAX_DEPTH, ParseError::TooDeep)?;
        self.depth += 1;
        Ok(self)
    }

    /// Leave the value entered by the matching [`descend`](Self::descend).
    pub fn ascend(mut self) -> Self {
        self.depth = self.depth.saturating_sub(1);
        self
    }

    /// Account for an alias copying `nodes` values nested `depth` deep.
    ///
    /// Fails when the copy would nest past [`MAX_DEPTH`] or when the
    /// document has copied more nodes through aliases than its size allows.
    pub fn expand_alias(mut self, name: &str, nodes: usize, depth: usize) -> Result<Self> {
        let budget = self
            .tokens
            .len()
            .saturating_mul(ALIAS_NODES_PER_TOKEN)
            .max(MIN_ALIAS_NODES);
        self.guard(self.depth + depth <= MAX_DEPTH + 1, ParseError::TooDeep)?;
        self.expanded = self.expanded.saturating_add(nodes);
        self.guard(self.expanded <= budget, |near| {
            ParseError::AliasExpansion(name.to_string(), near)
        })?;
        Ok(self)
    }

    /// The current token; past the end of the stream this is `End`.
    pub fn peek(&self) -> &'t Token {
        self.tokens.get(self.pos).unwrap_or(&END)
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub fn peek_text(&self) -> &'t str {
        &self.peek().text
    }

    /// Kind of the first token after the current one that is not a space.
    pub fn next_kind(&self) -> TokenKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .skip(1)
            .map(|t| t.kind)
            .find(|&kind| kind != TokenKind::Space)
            .unwrap_or(TokenKind::End)
    }

    pub fn advance(mut self) -> Self {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        self
    }

    /// Skip comments, spaces and newlines.
    pub fn skip_space(mut self) -> Self {
        while self.peek_kind().is_space() {
            self.pos += 1;
        }
        self
    }

    /// Skip comments, spaces, newlines and `...` markers.
    pub fn skip_doc_end(mut self) -> Self {
        while self.peek_kind().is_space() || self.peek_kind() == TokenKind::DocEnd {
            self.pos += 1;
        }
        self
    }

    /// Consume a token of `kind`, or fail with `expected <what>`.
    pub fn expect(self, kind: TokenKind, what: &'static str) -> Result<Self> {
        self.guard(self.peek_kind() == kind, |near| ParseError::Expected(what, near))?;
        Ok(self.advance())
    }

    /// Fail with the error built by `err` unless `check` holds.
    pub fn guard<F>(&self, check: bool, err: F) -> Result<()>
    where
        F: FnOnce(Near) -> ParseError,
    {
        if check {
            Ok(())
        } else {
            Err(err(self.near()))
        }
    }

    /// Register `value` under `name`.
    pub fn with_anchor(mut self, name: &str, value: Value) -> Self {
        Arc::make_mut(&mut self.anchors).insert(name.to_string(), value);
        self
    }

    pub fn anchor(&self, name: &str) -> Option<&Value> {
        self.anchors.get(name)
    }

    /// The same position with an empty anchor table.
    pub fn without_anchors(mut self) -> Self {
        self.anchors = Anchors::default();
        self
    }

    /// Error context: the source text of the remaining tokens, up to
    /// [`CONTEXT_CHARS`] characters.
    pub fn near(&self) -> Near {
        let mut text = String::new();
        for token in &self.tokens[self.pos.min(self.tokens.len())..] {
            if token.kind == TokenKind::End || text.chars().count() >= CONTEXT_CHARS {
                break;
            }
            text.push_str(&token.text);
        }
        Near::new(&text)
    }
}
