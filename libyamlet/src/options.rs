//! Parser configuration.

/// How long an anchor stays visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorScope {
    /// Anchors are cleared at the start of every document.
    #[default]
    Document,
    /// Anchors defined in one document remain visible in the documents
    /// after it.
    Stream,
}

/// Options for the `*_with_options` entry points.
///
/// ```
/// use libyamlet::{AnchorScope, ParseOptions};
///
/// let options = ParseOptions::new()
///     .anchor_scope(AnchorScope::Stream)
///     .source_name("config.yaml");
/// assert_eq!(options.source_name.as_deref(), Some("config.yaml"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub anchor_scope: AnchorScope,
    /// Name reported as ` of <name>` after the context of every error.
    pub source_name: Option<String>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor_scope(mut self, scope: AnchorScope) -> Self {
        self.anchor_scope = scope;
        self
    }

    pub fn source_name(mut self, name: &str) -> Self {
        self.source_name = Some(name.to_string());
        self
    }
}
