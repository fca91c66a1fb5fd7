//! Tokenizer
//!
//! The lexer walks the source left to right and, at each position, commits
//! to the first lexical rule that matches. It tracks an indentation stack
//! and emits:
//! - `Indent`: when a line (or a `-`, `?` or `:` marker) opens a deeper level
//! - `Dedent`: once per level closed by a less indented line
//! - `Newline`: for every line break that does not open a level
//!
//! Indentation is ignored inside flow collections.

use std::fmt;

use log::{debug, trace};
use once_cell::sync::Lazy;

use crate::error::{Near, ParseError, Result};
use crate::pattern::{normalize_breaks, Pattern};
use crate::scanner::{
    is_document_marker, is_safe_in, parse_block_header, plain_run, scan_block_scalar,
    scan_plain_block,
};

/// Kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Directive,
    DocStart,
    DocEnd,
    Comment,
    Space,
    Newline,
    Indent,
    Dedent,
    Dash,
    QuestionMark,
    Colon,
    Comma,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Anchor,
    Alias,
    LiteralBlock,
    FoldedBlock,
    Null,
    True,
    False,
    Int,
    IntOctal,
    IntHex,
    IntSexagesimal,
    Double,
    PosInfinity,
    NegInfinity,
    NaN,
    PlainString,
    DoubleQuoted,
    SingleQuoted,
    End,
}

impl TokenKind {
    /// Plain, double-quoted or single-quoted string.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::PlainString | TokenKind::DoubleQuoted | TokenKind::SingleQuoted
        )
    }

    /// Comment, space or newline: tokens with no meaning to the parser.
    pub fn is_space(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Space | TokenKind::Newline)
    }

    fn name(self) -> &'static str {
        match self {
            TokenKind::Directive => "%YAML",
            TokenKind::DocStart => "doc-start",
            TokenKind::DocEnd => "doc-end",
            TokenKind::Comment => "comment",
            TokenKind::Space => "space",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Dash => "dash",
            TokenKind::QuestionMark => "question-mark",
            TokenKind::Colon => "colon",
            TokenKind::Comma => "comma",
            TokenKind::OpenBracket => "open-bracket",
            TokenKind::CloseBracket => "close-bracket",
            TokenKind::OpenBrace => "open-brace",
            TokenKind::CloseBrace => "close-brace",
            TokenKind::Anchor => "anchor",
            TokenKind::Alias => "alias",
            TokenKind::LiteralBlock => "literal-block",
            TokenKind::FoldedBlock => "folded-block",
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Int => "int",
            TokenKind::IntOctal => "int-octal",
            TokenKind::IntHex => "int-hex",
            TokenKind::IntSexagesimal => "int-sexagesimal",
            TokenKind::Double => "double",
            TokenKind::PosInfinity => "+infinity",
            TokenKind::NegInfinity => "-infinity",
            TokenKind::NaN => "nan",
            TokenKind::PlainString => "plain-string",
            TokenKind::DoubleQuoted => "double-quoted-string",
            TokenKind::SingleQuoted => "single-quoted-string",
            TokenKind::End => "end",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token: its kind and the text it stands for.
///
/// For block scalars the text is the extracted block content rather than
/// the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Scalars must end at a flow indicator, a comment, a line break, or the
/// end of input, possibly after spaces.
fn scalar_end(rest: &str) -> bool {
    let trimmed = rest.trim_start_matches(' ');
    match trimmed.chars().next() {
        None | Some('\n' | ',' | ']' | '}') => true,
        Some('#') => trimmed.len() < rest.len(),
        Some(_) => false,
    }
}

fn scalar(kind: TokenKind, expr: &str) -> (TokenKind, Pattern) {
    let pattern = Pattern::new(expr)
        .expect("valid regex")
        .followed_by(scalar_end);
    (kind, pattern)
}

/// Scalar rules in the order they are tried.
static SCALARS: Lazy<Vec<(TokenKind, Pattern)>> = Lazy::new(|| {
    vec![
        scalar(TokenKind::Null, "null|Null|NULL|~"),
        scalar(TokenKind::True, "true|True|TRUE"),
        scalar(TokenKind::False, "false|False|FALSE"),
        scalar(TokenKind::PosInfinity, r"\+?\.(?:inf|Inf|INF)"),
        scalar(TokenKind::NegInfinity, r"-\.(?:inf|Inf|INF)"),
        scalar(TokenKind::NaN, r"\.(?:nan|NaN|NAN)"),
        scalar(TokenKind::Int, "[-+]?[0-9]+"),
        scalar(TokenKind::IntOctal, "0o[0-7]+"),
        scalar(TokenKind::IntHex, "0x[0-9a-fA-F]+"),
        scalar(TokenKind::IntSexagesimal, "[-+]?[0-9]{2}(?::[0-9]{2})+"),
        scalar(
            TokenKind::Double,
            r"[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?",
        ),
    ]
});

static DIRECTIVE: Lazy<Pattern> = Lazy::new(|| {
    Pattern::new("%YAML")
        .expect("valid regex")
        .followed_by(|rest| rest.starts_with(' '))
});
static COMMENT: Lazy<Pattern> = Lazy::new(|| Pattern::new("#[^\n]*").expect("valid regex"));
static BLANK_LINE: Lazy<Pattern> = Lazy::new(|| {
    Pattern::new("\n *(?:#[^\n]*)?")
        .expect("valid regex")
        .followed_by(|rest| rest.is_empty() || rest.starts_with('\n'))
});
static SPACE: Lazy<Pattern> = Lazy::new(|| Pattern::new(" +").expect("valid regex"));
static NEWLINE: Lazy<Pattern> = Lazy::new(|| Pattern::new("\n *").expect("valid regex"));
static ANCHOR: Lazy<Pattern> = Lazy::new(|| Pattern::new(r"&\w+").expect("valid regex"));
static ALIAS: Lazy<Pattern> = Lazy::new(|| Pattern::new(r"\*\w+").expect("valid regex"));
static DOUBLE_QUOTED: Lazy<Pattern> =
    Lazy::new(|| Pattern::new(r#""(?:[^"\\]|\\[\s\S])*""#).expect("valid regex"));
static SINGLE_QUOTED: Lazy<Pattern> =
    Lazy::new(|| Pattern::new("'(?:[^']|'')*'").expect("valid regex"));

/// Width of the block indicator at the start of `rest`, if `marker` opens
/// an entry there: the marker plus the blanks up to the entry content.
/// An entry with no content on its line is treated as one level deeper
/// than the marker.
fn entry_width(rest: &str, marker: char) -> Option<usize> {
    let after = rest.strip_prefix(marker)?;
    let blanks = after.len() - after.trim_start_matches([' ', '\t']).len();
    let next = after[blanks..].chars().next();
    let width = match (blanks, next) {
        (0, None | Some('\n')) => 1,
        (0, _) => return None,
        (k, Some('#' | '\n')) => k,
        (k, _) => 1 + k,
    };
    Some(width.max(2))
}

fn starts_dash_entry(rest: &str) -> bool {
    entry_width(rest, '-').is_some()
}

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    line_start: usize,
    indents: Vec<usize>,
    flow_depth: usize,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            line_start: 0,
            indents: vec![0],
            flow_depth: 0,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    /// Column of the current position in characters.
    fn column(&self) -> usize {
        self.source[self.line_start..self.pos].chars().count()
    }

    fn top(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    fn emit(&mut self, kind: TokenKind, text: &str) {
        self.tokens.push(Token::new(kind, text));
    }

    fn consume(&mut self, len: usize) {
        let consumed = &self.source[self.pos..self.pos + len];
        if let Some(offset) = consumed.rfind('\n') {
            self.line_start = self.pos + offset + 1;
        }
        self.pos += len;
    }

    fn emit_consume(&mut self, kind: TokenKind, len: usize) {
        let source = self.source;
        self.emit(kind, &source[self.pos..self.pos + len]);
        self.consume(len);
    }

    fn run(mut self) -> Result<Vec<Token>> {
        while self.pos < self.source.len() {
            self.next_token()?;
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.emit(TokenKind::Dedent, "");
        }
        self.emit(TokenKind::End, "");
        Ok(self.tokens)
    }

    fn next_token(&mut self) -> Result<()> {
        let rest = self.rest();

        if let Some(len) = DIRECTIVE.match_len(rest) {
            self.emit_consume(TokenKind::Directive, len);
            return Ok(());
        }
        if self.pos == self.line_start && is_document_marker(rest) {
            let kind = if rest.starts_with('-') {
                TokenKind::DocStart
            } else {
                TokenKind::DocEnd
            };
            self.emit_consume(kind, 3);
            return Ok(());
        }
        if let Some(len) = COMMENT.match_len(rest).or_else(|| BLANK_LINE.match_len(rest)) {
            self.emit_consume(TokenKind::Comment, len);
            return Ok(());
        }
        if let Some(len) = SPACE.match_len(rest) {
            self.emit_consume(TokenKind::Space, len);
            return Ok(());
        }
        if let Some(len) = NEWLINE.match_len(rest) {
            self.newline(len);
            return Ok(());
        }
        if let Some(width) = entry_width(rest, '-') {
            self.entry(TokenKind::Dash, width);
            return Ok(());
        }
        for (kind, pattern) in SCALARS.iter() {
            if let Some(len) = pattern.match_len(rest) {
                self.emit_consume(*kind, len);
                return Ok(());
            }
        }
        if let Some(len) = ANCHOR.match_len(rest) {
            self.emit_consume(TokenKind::Anchor, len);
            return Ok(());
        }
        if let Some(len) = ALIAS.match_len(rest) {
            self.emit_consume(TokenKind::Alias, len);
            return Ok(());
        }

        let first = rest.chars().next().unwrap_or('\0');
        match first {
            ',' => {
                self.emit_consume(TokenKind::Comma, 1);
                return Ok(());
            }
            '[' | '{' => {
                self.flow_depth += 1;
                let kind = if first == '[' {
                    TokenKind::OpenBracket
                } else {
                    TokenKind::OpenBrace
                };
                self.emit_consume(kind, 1);
                return Ok(());
            }
            ']' | '}' => {
                self.flow_depth = self.flow_depth.saturating_sub(1);
                let kind = if first == ']' {
                    TokenKind::CloseBracket
                } else {
                    TokenKind::CloseBrace
                };
                self.emit_consume(kind, 1);
                return Ok(());
            }
            '?' => {
                if let Some(width) = entry_width(rest, '?') {
                    self.entry(TokenKind::QuestionMark, width);
                    return Ok(());
                }
            }
            ':' if !rest[1..].starts_with(':') => {
                self.emit_consume(TokenKind::Colon, 1);
                if self.flow_depth == 0 {
                    let level = self.top() + 1;
                    self.indents.push(level);
                    self.emit(TokenKind::Indent, "");
                }
                return Ok(());
            }
            '|' | '>' => return self.block_scalar(),
            '@' | '`' => return Err(ParseError::ReservedChar(first, Near::new(rest))),
            _ => {}
        }

        if let Some(len) = DOUBLE_QUOTED.match_len(rest) {
            self.emit_consume(TokenKind::DoubleQuoted, len);
            return Ok(());
        }
        if let Some(len) = SINGLE_QUOTED.match_len(rest) {
            self.emit_consume(TokenKind::SingleQuoted, len);
            return Ok(());
        }
        if self.flow_depth == 0 {
            if let Some(plain) = scan_plain_block(rest, self.top()) {
                self.emit(TokenKind::PlainString, &plain.text);
                self.consume(plain.consumed);
                return Ok(());
            }
        }
        let len = plain_run(rest, is_safe_in, true);
        if len > 0 {
            let text = rest[..len].trim_matches([' ', '\t']);
            self.emit(TokenKind::PlainString, text);
            self.consume(len);
            return Ok(());
        }

        Err(ParseError::UnexpectedInput(Near::new(rest)))
    }

    /// A line break followed by the indentation of the next content line.
    fn newline(&mut self, len: usize) {
        let source = self.source;
        let text = &source[self.pos..self.pos + len];
        let spaces = len - 1;
        let top = self.top();
        self.consume(len);

        if self.flow_depth > 0 || spaces == top {
            self.emit(TokenKind::Newline, text);
        } else if spaces > top {
            let pending = self.tokens.last().map(|t| t.kind) == Some(TokenKind::Indent);
            if pending {
                if let Some(last) = self.tokens.last_mut() {
                    last.text = text.to_string();
                }
                if let Some(level) = self.indents.last_mut() {
                    *level = spaces;
                }
            } else {
                self.indents.push(spaces);
                self.emit(TokenKind::Indent, text);
            }
        } else {
            // A sequence may sit one column left of the mapping value
            // level opened by its key's colon.
            let nested = starts_dash_entry(self.rest());
            if !(nested && spaces + 1 == top) {
                while self.indents.len() > 1 {
                    let limit = if nested { spaces + 1 } else { spaces };
                    if limit >= self.top() {
                        break;
                    }
                    self.indents.pop();
                    self.emit(TokenKind::Dedent, "");
                }
            }
            self.emit(TokenKind::Newline, text);
        }
    }

    /// `-` or `?` followed by the blanks before the entry content.
    fn entry(&mut self, kind: TokenKind, width: usize) {
        let level = self.column() + width;
        self.indents.push(level);
        let rest = self.rest();
        let marker = &rest[..1];
        let blanks = rest[1..].len() - rest[1..].trim_start_matches([' ', '\t']).len();
        let blanks = blanks.min(width - 1);
        let indent = &rest[1..1 + blanks];
        self.emit(kind, marker);
        self.emit(TokenKind::Indent, indent);
        self.consume(1 + blanks);
    }

    /// `|` or `>` header plus the block scalar body that follows it.
    fn block_scalar(&mut self) -> Result<()> {
        let rest = self.rest();
        let header_len = rest.find('\n').unwrap_or(rest.len());
        let header = parse_block_header(&rest[..header_len])
            .ok_or_else(|| ParseError::InvalidBlockHeader(Near::new(rest)))?;
        let parent = match self.indents.len() {
            n if n >= 2 => Some(self.indents[n - 2]),
            _ => None,
        };
        let block = scan_block_scalar(&rest[header_len..], &header, parent)?;
        let kind = if header.folded {
            TokenKind::FoldedBlock
        } else {
            TokenKind::LiteralBlock
        };
        self.emit(kind, &block.text);
        self.consume(header_len + block.consumed);
        Ok(())
    }
}

/// Convert source text into a token stream ending with an `End` token.
///
/// Line breaks are normalised to `\n` first.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let source = normalize_breaks(text);
    let tokens = Lexer::new(&source).run()?;
    debug!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    for token in &tokens {
        trace!("{} {:?}", token.kind, token.text);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(kinds("~"), vec![Null, End]);
        assert_eq!(kinds("True"), vec![True, End]);
        assert_eq!(kinds("0x1F"), vec![IntHex, End]);
        assert_eq!(kinds("0o17"), vec![IntOctal, End]);
        assert_eq!(kinds("02:30"), vec![IntSexagesimal, End]);
        assert_eq!(kinds("-1.5e3"), vec![Double, End]);
        assert_eq!(kinds("-.inf"), vec![NegInfinity, End]);
        assert_eq!(kinds(".NaN"), vec![NaN, End]);
        assert_eq!(kinds("12 # twelve"), vec![Int, Space, Comment, End]);
    }

    #[test]
    fn test_scalar_needs_terminator() {
        assert_eq!(kinds("12abc"), vec![PlainString, End]);
        assert_eq!(kinds("nullable"), vec![PlainString, End]);
        let tokens = tokenize("12: x").unwrap();
        assert_eq!(tokens[0], Token::new(PlainString, "12"));
        assert_eq!(tokens[1].kind, Colon);
    }

    #[test]
    fn test_block_mapping() {
        assert_eq!(
            kinds("a: 1\nb: 2\n"),
            vec![
                PlainString, Colon, Indent, Space, Int, Dedent, Newline, PlainString, Colon,
                Indent, Space, Int, Comment, Dedent, End
            ]
        );
    }

    #[test]
    fn test_nested_mapping_coalesces_indent() {
        let tokens = tokenize("a:\n  b: 1\n").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PlainString, Colon, Indent, PlainString, Colon, Indent, Space, Int, Comment,
                Dedent, Dedent, End
            ]
        );
        assert_eq!(tokens[2].text, "\n  ");
    }

    #[test]
    fn test_block_sequence() {
        assert_eq!(
            kinds("- 1\n- 2\n"),
            vec![Dash, Indent, Int, Dedent, Newline, Dash, Indent, Int, Comment, Dedent, End]
        );
    }

    #[test]
    fn test_sequence_at_key_indentation() {
        assert_eq!(
            kinds("a:\n- 1\n"),
            vec![PlainString, Colon, Indent, Newline, Dash, Indent, Int, Comment, Dedent, Dedent, End]
        );
    }

    #[test]
    fn test_empty_sequence_entries() {
        assert_eq!(
            kinds("-\n- b"),
            vec![Dash, Indent, Dedent, Newline, Dash, Indent, PlainString, Dedent, End]
        );
    }

    #[test]
    fn test_flow_ignores_indentation() {
        assert_eq!(
            kinds("[a,\n    b,\n c]"),
            vec![
                OpenBracket, PlainString, Comma, Newline, PlainString, Comma, Newline,
                PlainString, CloseBracket, End
            ]
        );
    }

    #[test]
    fn test_flow_mapping_colon() {
        assert_eq!(
            kinds("{a: 1}"),
            vec![OpenBrace, PlainString, Colon, Space, Int, CloseBrace, End]
        );
    }

    #[test]
    fn test_multi_line_plain() {
        let tokens = tokenize("a b\n  c d\n").unwrap();
        assert_eq!(tokens[0], Token::new(PlainString, "a b\nc d\n"));
    }

    #[test]
    fn test_plain_with_comment() {
        let tokens = tokenize("a: b # note\n").unwrap();
        assert_eq!(tokens[4], Token::new(PlainString, "b"));
        assert_eq!(tokens[5].kind, Comment);
    }

    #[test]
    fn test_quoted() {
        let tokens = tokenize(r#"- "a\"b"
- 'it''s'"#)
        .unwrap();
        assert_eq!(tokens[2], Token::new(DoubleQuoted, r#""a\"b""#));
        assert_eq!(tokens[7], Token::new(SingleQuoted, "'it''s'"));
    }

    #[test]
    fn test_block_scalar() {
        let tokens = tokenize("a: |\n  x\n  y\nb: >-\n  z\n").unwrap();
        assert_eq!(tokens[4], Token::new(LiteralBlock, "x\ny\n"));
        assert_eq!(tokens[5].kind, Dedent);
        assert!(tokens
            .iter()
            .any(|t| *t == Token::new(FoldedBlock, "z")));
    }

    #[test]
    fn test_document_markers() {
        assert_eq!(
            kinds("%YAML 1.2\n---\na\n...\n"),
            vec![
                Directive, Space, Double, Newline, DocStart, Newline, PlainString, Newline,
                DocEnd, Comment, End
            ]
        );
        assert_eq!(kinds("---a"), vec![PlainString, End]);
    }

    #[test]
    fn test_document_marker_only_at_line_start() {
        assert_eq!(kinds("a ---"), vec![PlainString, End]);
        assert_eq!(kinds("[---]"), vec![OpenBracket, PlainString, CloseBracket, End]);
    }

    #[test]
    fn test_long_line() {
        let n = 50_000;
        let text = format!("[{}]", vec!["0"; n].join(","));
        let start = std::time::Instant::now();
        let tokens = tokenize(&text).unwrap();
        assert_eq!(tokens.len(), 2 * n + 2);
        assert!(start.elapsed() < std::time::Duration::from_secs(30));
    }

    #[test]
    fn test_anchor_and_alias() {
        assert_eq!(
            kinds("- &x 1\n- *x"),
            vec![Dash, Indent, Anchor, Space, Int, Dedent, Newline, Dash, Indent, Alias, Dedent, End]
        );
    }

    #[test]
    fn test_crlf_normalised() {
        assert_eq!(kinds("a: 1\r\nb: 2"), kinds("a: 1\nb: 2"));
    }

    #[test]
    fn test_reserved() {
        let err = tokenize("@foo").unwrap_err();
        assert_eq!(err.to_string(), "reserved character \"@\", near \"@foo\"");
    }

    #[test]
    fn test_unexpected_input() {
        let err = tokenize("\u{1}").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedInput(_)));
    }

    #[test]
    fn test_invalid_block_header() {
        let err = tokenize("a: |x\n  b\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid chomp or indent header, near \"|x\\n  b\\n\""
        );
    }
}
