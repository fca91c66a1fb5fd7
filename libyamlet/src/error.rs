//! Error types for Yamlet parsing.

use std::fmt;

use thiserror::Error;

use crate::lexer::TokenKind;

/// Result type for Yamlet parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Number of characters of unconsumed input quoted in error messages.
pub const CONTEXT_CHARS: usize = 50;

/// Location of an error: the start of the input that was not consumed yet,
/// and the name of the source when one was configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Near {
    snippet: String,
    source: Option<String>,
}

impl Near {
    /// Capture the escaped prefix of `remaining` as error context.
    pub fn new(remaining: &str) -> Self {
        Self {
            snippet: escape_context(remaining),
            source: None,
        }
    }

    /// The escaped input snippet, without surrounding quotes.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// The source name, if one was attached.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for Near {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", near \"{}\"", self.snippet)?;
        if let Some(name) = &self.source {
            write!(f, " of <{}>", name)?;
        }
        Ok(())
    }
}

/// Truncate `text` to [`CONTEXT_CHARS`] characters and escape quotes and
/// control characters so the snippet fits on one line.
pub fn escape_context(text: &str) -> String {
    let mut escaped = String::new();
    for c in text.chars().take(CONTEXT_CHARS) {
        match c {
            '"' => escaped.push_str("\\\""),
            c if c.is_control() => escaped.extend(c.escape_default()),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Broad category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No lexical rule matched, or a reserved character was found.
    Lexical,
    /// A block scalar violates its indentation rules.
    Indentation,
    /// The token stream does not have the expected shape.
    Structural,
    /// A mapping key appears twice.
    DuplicateKey,
    /// An alias refers to an anchor that was never defined.
    UnknownAlias,
    /// A `%YAML` directive is malformed or repeated.
    InvalidDirective,
    /// An integer literal does not fit in 64 bits.
    NumericOverflow,
}

/// Error type for Yamlet parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No lexical rule matches the input.
    #[error("unexpected input{0}")]
    UnexpectedInput(Near),

    /// `@` or `` ` `` at the start of a token.
    #[error("reserved character \"{0}\"{1}")]
    ReservedChar(char, Near),

    /// Malformed indentation or chomping indicator after `|` or `>`.
    #[error("invalid chomp or indent header{0}")]
    InvalidBlockHeader(Near),

    /// Blank line before the first block scalar line is indented too far.
    #[error("leading all-space line must not have too many spaces{0}")]
    OverIndentedLeadingLine(Near),

    /// Block scalar content is indented less than its explicit indicator.
    #[error("less indented block scalar than the indicated level{0}")]
    UnderIndentedBlock(Near),

    /// A specific token was required.
    #[error("expected {0}{1}")]
    Expected(&'static str, Near),

    /// Values nest deeper than the parser allows.
    #[error("nesting too deep{0}")]
    TooDeep(Near),

    /// Aliases copy more nodes than the size of the document allows.
    #[error("alias expansion too large {0}{1}")]
    AliasExpansion(String, Near),

    /// A token that cannot start a value.
    #[error("unexpected {0}{1}")]
    UnexpectedToken(TokenKind, Near),

    /// Mapping key already present.
    #[error("duplicate key {0}{1}")]
    DuplicateKey(String, Near),

    /// Alias without a matching anchor.
    #[error("unknown alias {0}{1}")]
    UnknownAlias(String, Near),

    /// `%YAML` version other than 1.1 or 1.2.
    #[error("invalid yaml version {0}{1}")]
    InvalidVersion(String, Near),

    /// Second `%YAML` directive in one document header.
    #[error("duplicate yaml directive{0}")]
    DuplicateDirective(Near),

    /// Integer literal outside the signed 64-bit range.
    #[error("integer out of range {0}{1}")]
    NumericOverflow(String, Near),
}

impl ParseError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnexpectedInput(_)
            | ParseError::ReservedChar(..)
            | ParseError::InvalidBlockHeader(_) => ErrorKind::Lexical,
            ParseError::OverIndentedLeadingLine(_) | ParseError::UnderIndentedBlock(_) => {
                ErrorKind::Indentation
            }
            ParseError::Expected(..)
            | ParseError::TooDeep(_)
            | ParseError::AliasExpansion(..)
            | ParseError::UnexpectedToken(..) => ErrorKind::Structural,
            ParseError::DuplicateKey(..) => ErrorKind::DuplicateKey,
            ParseError::UnknownAlias(..) => ErrorKind::UnknownAlias,
            ParseError::InvalidVersion(..) | ParseError::DuplicateDirective(_) => {
                ErrorKind::InvalidDirective
            }
            ParseError::NumericOverflow(..) => ErrorKind::NumericOverflow,
        }
    }

    /// Where the error happened.
    pub fn near(&self) -> &Near {
        match self {
            ParseError::UnexpectedInput(near)
            | ParseError::ReservedChar(_, near)
            | ParseError::InvalidBlockHeader(near)
            | ParseError::OverIndentedLeadingLine(near)
            | ParseError::UnderIndentedBlock(near)
            | ParseError::Expected(_, near)
            | ParseError::TooDeep(near)
            | ParseError::AliasExpansion(_, near)
            | ParseError::UnexpectedToken(_, near)
            | ParseError::DuplicateKey(_, near)
            | ParseError::UnknownAlias(_, near)
            | ParseError::InvalidVersion(_, near)
            | ParseError::DuplicateDirective(near)
            | ParseError::NumericOverflow(_, near) => near,
        }
    }

    /// Attach a source name, reported as ` of <name>` after the snippet.
    pub fn with_source(mut self, name: &str) -> Self {
        let near = match &mut self {
            ParseError::UnexpectedInput(near)
            | ParseError::ReservedChar(_, near)
            | ParseError::InvalidBlockHeader(near)
            | ParseError::OverIndentedLeadingLine(near)
            | ParseError::UnderIndentedBlock(near)
            | ParseError::Expected(_, near)
            | ParseError::TooDeep(near)
            | ParseError::AliasExpansion(_, near)
            | ParseError::UnexpectedToken(_, near)
            | ParseError::DuplicateKey(_, near)
            | ParseError::UnknownAlias(_, near)
            | ParseError::InvalidVersion(_, near)
            | ParseError::DuplicateDirective(near)
            | ParseError::NumericOverflow(_, near) => near,
        };
        near.source = Some(name.to_string());
        self
    }
}
