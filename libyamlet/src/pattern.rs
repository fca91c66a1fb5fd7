//! Anchored regular expressions and substitution helpers.
//!
//! The `regex` crate has no lookahead, so a [`Pattern`] pairs an anchored
//! expression with an optional `follow` predicate that inspects the text
//! right after the match.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Predicate over the text that follows a match.
pub type Follow = fn(&str) -> bool;

/// A regular expression anchored at the start of the input.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    follow: Option<Follow>,
}

impl Pattern {
    /// Compile `expr` anchored at the start of the input.
    pub fn new(expr: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&format!("^(?:{})", expr))?,
            follow: None,
        })
    }

    /// Require `follow` to hold for the text after the match.
    pub fn followed_by(mut self, follow: Follow) -> Self {
        self.follow = Some(follow);
        self
    }

    /// Length in bytes of the match at the start of `text`, if any.
    pub fn match_len(&self, text: &str) -> Option<usize> {
        let m = self.regex.find(text)?;
        self.accepts(text, m.end()).then_some(m.end())
    }

    /// Capture groups of the match at the start of `text`, if any.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        let caps = self.regex.captures(text)?;
        let end = caps.get(0)?.end();
        self.accepts(text, end).then_some(caps)
    }

    fn accepts(&self, text: &str, end: usize) -> bool {
        match self.follow {
            Some(follow) => follow(&text[end..]),
            None => true,
        }
    }
}

/// Replace every match of `regex` in `text` using a `$n` template.
pub fn replace(regex: &Regex, text: &str, template: &str) -> String {
    regex.replace_all(text, template).into_owned()
}

/// Replace every match of `regex` in `text` with the result of `f`.
pub fn replace_with<F>(regex: &Regex, text: &str, mut f: F) -> String
where
    F: FnMut(&Captures) -> String,
{
    regex.replace_all(text, |caps: &Captures| f(caps)).into_owned()
}

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("valid regex"));

/// Convert `\r\n` and lone `\r` line breaks to `\n`.
pub fn normalize_breaks(text: &str) -> String {
    replace(&LINE_BREAK, text, "\n")
}
