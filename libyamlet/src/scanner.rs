//! Multi-line scanning for the lexer.
//!
//! Most tokens are matched by a single anchored pattern. Two constructs
//! span lines and need their own scanners:
//! - Plain scalars in block context, which continue onto following lines
//!   that are indented at least to the current level.
//! - Block scalars (`|` and `>`), whose body is taken verbatim from the
//!   source up to the first line indented less than the block.

use once_cell::sync::Lazy;

use crate::error::{Near, ParseError, Result};
use crate::pattern::Pattern;

/// Printable non-space characters allowed in a plain scalar inside a flow
/// collection. Excludes `:` `#` and the flow indicators `,[]{}`.
pub fn is_safe_in(c: char) -> bool {
    matches!(c,
        '\u{21}' | '\u{22}'
        | '\u{24}'..='\u{2b}'
        | '\u{2d}'..='\u{39}'
        | '\u{3b}'..='\u{5a}'
        | '\u{5c}'
        | '\u{5e}'..='\u{7a}'
        | '\u{7c}'
        | '\u{7e}'
        | '\u{85}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fefe}'
        | '\u{ff00}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
}

/// Characters allowed in a plain scalar outside flow collections.
pub fn is_safe_out(c: char) -> bool {
    is_safe_in(c) || matches!(c, ',' | '[' | ']' | '{' | '}')
}

/// Byte length of the plain-scalar run at the start of `text`.
///
/// A `#` is part of the run only directly after a safe character, and a
/// `:` only when a non-blank character follows it.
pub fn plain_run(text: &str, safe: fn(char) -> bool, breaks: bool) -> usize {
    let mut chars = text.char_indices().peekable();
    let mut end = 0;
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let accepted = if safe(c) {
            if next == Some('#') {
                chars.next();
                end = i + c.len_utf8() + 1;
                continue;
            }
            true
        } else if c == ':' {
            !matches!(next, None | Some(' ' | '\t' | '\n'))
        } else {
            c == ' ' || c == '\t' || (breaks && c == '\n')
        };
        if !accepted {
            break;
        }
        end = i + c.len_utf8();
    }
    end
}

/// A scanned multi-line token: the raw value and the source bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub text: String,
    pub consumed: usize,
}

fn trim_blanks(s: &str) -> &str {
    s.trim_matches([' ', '\t'])
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

fn is_blank_line(line: &str) -> bool {
    line.bytes().all(|b| b == b' ')
}

/// `---` or `...` followed by a blank, a line break, or the end of input.
pub fn is_document_marker(text: &str) -> bool {
    (text.starts_with("---") || text.starts_with("..."))
        && matches!(text[3..].chars().next(), None | Some(' ' | '\t' | '\n'))
}

/// Scan a plain scalar in block context whose continuation lines must be
/// indented by at least `indent` spaces.
///
/// Returns `None` when the run does not end at a line break, a mapping
/// colon, a comment, or the end of input.
pub fn scan_plain_block(text: &str, indent: usize) -> Option<Scanned> {
    let len = plain_run(text, is_safe_out, false);
    if len == 0 {
        return None;
    }
    let run = &text[..len];
    let after = &text[len..];
    let comment = after.starts_with('#');
    let terminated = after.is_empty()
        || after.starts_with('\n')
        || after.starts_with(':')
        || (comment && run.ends_with([' ', '\t']));
    if !terminated {
        return None;
    }

    let mut value = trim_blanks(run).to_string();
    let mut consumed = len;
    if comment {
        return Some(Scanned { text: value, consumed });
    }
    while let Some(body) = text[consumed..].strip_prefix('\n') {
        let line = body.split('\n').next().unwrap_or("");
        if is_blank_line(line) {
            value.push('\n');
        } else if continues_plain(line, indent) {
            value.push('\n');
            value.push_str(trim_blanks(line));
        } else {
            break;
        }
        consumed += 1 + line.len();
    }
    Some(Scanned { text: value, consumed })
}

fn continues_plain(line: &str, indent: usize) -> bool {
    if leading_spaces(line) < indent || is_document_marker(line) {
        return false;
    }
    let rest = &line[indent..];
    !rest.is_empty() && plain_run(rest, is_safe_out, false) == rest.len()
}

/// Chomping indicator of a block scalar header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomp {
    /// `-`: drop every trailing line break.
    Strip,
    /// No indicator: keep exactly one trailing line break.
    Clip,
    /// `+`: keep all trailing line breaks.
    Keep,
}

/// Parsed `|` or `>` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub folded: bool,
    pub indent: Option<usize>,
    pub chomp: Chomp,
}

static HEADER: Lazy<Pattern> =
    Lazy::new(|| Pattern::new(r"([|>])([1-9][-+]|[-+][1-9]?|[1-9]?)").expect("valid regex"));

/// Parse a block scalar header line such as `|`, `>-` or `|2+ # note`.
pub fn parse_block_header(line: &str) -> Option<BlockHeader> {
    let caps = HEADER.captures(line)?;
    let whole = caps.get(0)?;
    let rest = &line[whole.end()..];
    let trimmed = rest.trim_start_matches(' ');
    if !(trimmed.is_empty() || (trimmed.starts_with('#') && rest.starts_with(' '))) {
        return None;
    }
    let indicators = caps.get(2).map_or("", |m| m.as_str());
    let chomp = if indicators.contains('-') {
        Chomp::Strip
    } else if indicators.contains('+') {
        Chomp::Keep
    } else {
        Chomp::Clip
    };
    let indent = indicators
        .chars()
        .find_map(|c| c.to_digit(10))
        .map(|d| d as usize);
    Some(BlockHeader {
        folded: &caps[1] == ">",
        indent,
        chomp,
    })
}

/// Scan the body of a block scalar.
///
/// `text` starts at the line break ending the header line. `parent` is the
/// indentation of the node that owns the scalar, if any: content must be
/// indented more than it, and an explicit indentation indicator counts
/// from it. The returned text has the block indentation removed and the
/// chomping indicator applied.
pub fn scan_block_scalar(
    text: &str,
    header: &BlockHeader,
    parent: Option<usize>,
) -> Result<Scanned> {
    let empty = Scanned {
        text: String::new(),
        consumed: 0,
    };
    let Some(body) = text.strip_prefix('\n') else {
        return Ok(empty);
    };
    let lines: Vec<&str> = body.split('\n').collect();
    let Some(first) = lines.iter().position(|line| !is_blank_line(line)) else {
        return Ok(empty);
    };
    let found = leading_spaces(lines[first]);
    let min = parent.map_or(0, |p| p + 1);
    if found < min {
        return Ok(empty);
    }

    let effective = match header.indent {
        Some(digit) => parent.unwrap_or(0) + digit,
        None => found,
    };
    if header.indent.is_some() && found < effective {
        return Err(ParseError::UnderIndentedBlock(Near::new(body)));
    }
    if lines[..first].iter().any(|line| line.len() > effective) {
        return Err(ParseError::OverIndentedLeadingLine(Near::new(body)));
    }

    let count = lines
        .iter()
        .take_while(|line| is_blank_line(line) || leading_spaces(line) >= effective)
        .count();
    let block: Vec<&str> = lines[..count]
        .iter()
        .map(|line| &line[leading_spaces(line).min(effective)..])
        .collect();
    // Leading break plus each line, without the break after the last one.
    let mut consumed: usize = lines[..count].iter().map(|line| line.len() + 1).sum();
    let mut value = block.join("\n");
    if consumed < text.len() {
        value.push('\n');
    } else {
        consumed = text.len();
    }

    Ok(Scanned {
        text: chomp(value, header.chomp),
        consumed,
    })
}

fn chomp(mut text: String, mode: Chomp) -> String {
    if mode == Chomp::Keep {
        return text;
    }
    let content_end = text.trim_end_matches([' ', '\n']).len();
    if let Some(offset) = text[content_end..].find('\n') {
        text.truncate(content_end + offset);
        if mode == Chomp::Clip {
            text.push('\n');
        }
    }
    text
}
