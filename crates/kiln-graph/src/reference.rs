//! References: the directed, typed edges authored inside resource content.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::node::ResourceKind;
use crate::url::ResourceUrl;

/// How a reference was authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Top-level request made by the caller, not by any resource.
    Entry,
    /// Static `import` / `export ... from`.
    ModuleImport,
    /// `import("...")`.
    DynamicImport,
    /// `@import` in a stylesheet.
    StyleImport,
    /// `url(...)` in a stylesheet.
    StyleUrl,
    /// `src` / `href` attribute in markup.
    MarkupAttribute,
    /// Content embedded in the referencing resource (inline `<script>`, `<style>`).
    InlineContent,
    /// Dependency named in a hot-update accept declaration.
    HotAccept,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::ModuleImport => "module-import",
            Self::DynamicImport => "dynamic-import",
            Self::StyleImport => "style-import",
            Self::StyleUrl => "style-url",
            Self::MarkupAttribute => "markup-attribute",
            Self::InlineContent => "inline-content",
            Self::HotAccept => "hot-accept",
        }
    }

    /// JavaScript module specifiers, where bare names are package imports.
    pub fn is_module_specifier(&self) -> bool {
        matches!(self, Self::ModuleImport | Self::DynamicImport | Self::HotAccept)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line and column inside the referencing resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Position of byte `offset` within `text`. Columns count characters.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = text.get(..offset).unwrap_or(text);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            line: line as u32,
            column: column as u32,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Content carried by an [`ReferenceKind::InlineContent`] reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineContent {
    pub content: String,
    pub content_type: String,
    /// Extension used for the inline resource's URL (`js`, `css`).
    pub extension: String,
}

/// A directed, typed reference from one resource (or the caller) to a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Specifier exactly as authored.
    pub specifier: String,
    pub kind: ReferenceKind,
    /// Resource containing the reference; `None` for entry requests.
    pub source_url: Option<ResourceUrl>,
    pub position: SourcePosition,
    /// Byte range of the specifier text in the source's transformed content.
    pub span: Option<Range<usize>>,
    /// Kind the target must have once loaded.
    pub expected_kind: Option<ResourceKind>,
    /// Content type the target must have once loaded.
    pub expected_content_type: Option<String>,
    pub inline: Option<InlineContent>,
}

impl Reference {
    pub fn new(specifier: impl Into<String>, kind: ReferenceKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            source_url: None,
            position: SourcePosition::default(),
            span: None,
            expected_kind: None,
            expected_content_type: None,
            inline: None,
        }
    }

    /// A top-level request for `specifier`, resolved relative to the session root.
    pub fn entry(specifier: impl Into<String>) -> Self {
        Self::new(specifier, ReferenceKind::Entry)
    }

    pub fn with_source(mut self, source: ResourceUrl) -> Self {
        self.source_url = Some(source);
        self
    }

    pub fn at(mut self, position: SourcePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn expect_kind(mut self, kind: ResourceKind) -> Self {
        self.expected_kind = Some(kind);
        self
    }

    pub fn expect_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.expected_content_type = Some(content_type.into());
        self
    }

    pub fn with_inline(mut self, inline: InlineContent) -> Self {
        self.inline = Some(inline);
        self
    }

    pub fn is_entry(&self) -> bool {
        self.source_url.is_none()
    }

    /// `source:line:column`, or `<entry>` for caller requests.
    pub fn location(&self) -> String {
        match &self.source_url {
            Some(source) => format!("{source}:{}", self.position),
            None => "<entry>".to_string(),
        }
    }
}
