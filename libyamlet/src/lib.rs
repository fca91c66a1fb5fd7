//! Yamlet: a parser for a practical subset of YAML 1.2.
//!
//! Yamlet turns configuration text into a [`Value`] tree of nulls,
//! booleans, 64-bit integers, floats, strings, sequences and mappings, or
//! fails with a [`ParseError`] that quotes the input where parsing stopped.
//!
//! # Parsing Pipeline
//!
//! The parser operates in three phases:
//!
//! 1. **Tokenizer**: Converts source text into a token stream, tracking an
//!    indentation stack so that block structure shows up as explicit
//!    indent and dedent tokens.
//!
//! 2. **Value Parser**: Recursively parses the token stream into values,
//!    resolving anchors and aliases along the way.
//!
//! 3. **Document Driver**: Handles `%YAML` directives and the `---` and
//!    `...` markers that separate documents in a stream.

mod context;
mod document;
mod error;
mod escape;
mod lexer;
mod options;
mod parser;
mod pattern;
mod scanner;
mod value;

pub use document::Documents;
pub use error::{ErrorKind, Near, ParseError, Result};
pub use lexer::{tokenize, Token, TokenKind};
pub use options::{AnchorScope, ParseOptions};
pub use value::{Mapping, Value};

/// Parse a single-document string.
///
/// # Example
///
/// ```
/// use libyamlet::{parse, Value};
///
/// let value = parse("name: yamlet\nports: [80, 443]\n").unwrap();
/// assert_eq!(value["ports"][1], Value::Int(443));
/// ```
pub fn parse(text: &str) -> Result<Value> {
    parse_with_options(text, &ParseOptions::default())
}

/// Parse a single-document string with the given options.
pub fn parse_with_options(text: &str, options: &ParseOptions) -> Result<Value> {
    let result = tokenize(text).and_then(|tokens| document::parse_single(&tokens));
    with_source(result, options)
}

/// Parse every document of a stream. Fails if any document fails.
///
/// # Example
///
/// ```
/// use libyamlet::parse_multiple;
///
/// let docs = parse_multiple("--- 1\n--- 2\n").unwrap();
/// assert_eq!(docs.len(), 2);
/// ```
pub fn parse_multiple(text: &str) -> Result<Vec<Value>> {
    parse_multiple_with_options(text, &ParseOptions::default())
}

/// Parse every document of a stream with the given options.
pub fn parse_multiple_with_options(text: &str, options: &ParseOptions) -> Result<Vec<Value>> {
    documents(text, options)?.collect()
}

/// Tokenize a stream and return an iterator over its documents.
///
/// Documents are parsed lazily; iteration stops after the first document
/// that fails.
pub fn documents(text: &str, options: &ParseOptions) -> Result<Documents> {
    let tokens = with_source(tokenize(text), options)?;
    Ok(Documents::new(tokens, options))
}

/// Parse a token stream holding exactly one document.
pub fn parse_tokens(tokens: &[Token]) -> Result<Value> {
    document::parse_single(tokens)
}

/// Parse every document of a token stream.
pub fn parse_all_tokens(tokens: &[Token]) -> Result<Vec<Value>> {
    Documents::new(tokens.to_vec(), &ParseOptions::default()).collect()
}

fn with_source<T>(result: Result<T>, options: &ParseOptions) -> Result<T> {
    match &options.source_name {
        Some(name) => result.map_err(|err| err.with_source(name)),
        None => result,
    }
}
