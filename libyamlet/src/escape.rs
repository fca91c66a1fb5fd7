//! Quoted-string unescaping and line folding.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::pattern::{replace, replace_with};

static DOUBLE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\\(?:([0abtnvfre "/\\N_LP\t])|x([0-9A-Fa-f]{2})|u([0-9A-Fa-f]{4})|U([0-9A-Fa-f]{8}))"#,
    )
    .expect("valid regex")
});

static LINE_EDGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]+|[ \t]+$|\\\n").expect("valid regex"));

fn escaped_char(c: char) -> char {
    match c {
        '0' => '\0',
        'a' => '\u{7}',
        'b' => '\u{8}',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\u{b}',
        'f' => '\u{c}',
        'r' => '\r',
        'e' => '\u{1b}',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        other => other,
    }
}

fn code_point(hex: &str) -> char {
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Resolve backslash escapes in the body of a double-quoted string.
///
/// Code points that are not valid scalar values become U+FFFD. Unknown
/// escapes are left as written.
pub fn unescape_double(s: &str) -> String {
    replace_with(&DOUBLE_ESCAPE, s, |caps: &Captures| {
        if let Some(m) = caps.get(1) {
            m.as_str().chars().map(escaped_char).collect()
        } else {
            let hex = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            code_point(hex).to_string()
        }
    })
}

/// Resolve `''` in the body of a single-quoted string.
pub fn unescape_single(s: &str) -> String {
    s.replace("''", "'")
}

/// Strip the surrounding quote characters of a quoted scalar.
pub fn unwrap_quoted(s: &str) -> &str {
    if s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        ""
    }
}

/// Fold a flow scalar: blanks around line breaks are dropped, a single line
/// break becomes a space, a run of n breaks becomes n - 1 breaks, and an
/// escaped line break joins the lines directly. Blanks at the very start
/// and end are kept.
pub fn fold_flow(flow: &str) -> String {
    let rest = flow.trim_start_matches([' ', '\t']);
    let lead = &flow[..flow.len() - rest.len()];
    let body = rest.trim_end_matches([' ', '\t']);
    let trail = &rest[body.len()..];
    let body = replace(&LINE_EDGES, body, "");

    let mut folded = String::with_capacity(flow.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\n' {
            folded.push(c);
            continue;
        }
        let mut breaks = 1;
        while chars.next_if_eq(&'\n').is_some() {
            breaks += 1;
        }
        if breaks == 1 {
            folded.push(' ');
        } else {
            folded.extend(std::iter::repeat('\n').take(breaks - 1));
        }
    }
    format!("{}{}{}", lead, folded, trail)
}

fn starts_plain(line: &str) -> bool {
    matches!(line.chars().next(), Some(c) if c != ' ' && c != '\t')
}

/// Fold the text of a `>` block scalar. Adjacent lines that both start
/// with a non-blank are joined by a space, and one break is dropped from a
/// run of empty lines between them. Lines starting with a blank are kept
/// as written, as is the trailing run of line breaks.
pub fn fold_block(block: &str) -> String {
    let body = block.trim_end_matches('\n');
    let trail = &block[body.len()..];
    let lines: Vec<&str> = body.split('\n').collect();

    let mut folded = String::with_capacity(block.len());
    let mut i = 0;
    while i < lines.len() {
        folded.push_str(lines[i]);
        let mut j = i + 1;
        while j < lines.len() && lines[j].is_empty() {
            j += 1;
        }
        if j >= lines.len() {
            break;
        }
        let empty = j - i - 1;
        let breaks = if starts_plain(lines[i]) && starts_plain(lines[j]) {
            empty
        } else {
            empty + 1
        };
        if breaks == 0 {
            folded.push(' ');
        } else {
            folded.extend(std::iter::repeat('\n').take(breaks));
        }
        i = j;
    }
    folded.push_str(trail);
    folded
}
