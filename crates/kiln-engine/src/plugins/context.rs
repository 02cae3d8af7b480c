use std::ops::Range;
use std::sync::Arc;

use kiln_graph::{Content, Reference, ResourceGraph, ResourceKind, ResourceUrl, Runtime};
use serde::{Deserialize, Serialize};

/// Whether the session serves resources live or produces a finalized tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Dev,
    Build,
}

/// Read-only view of the session handed to every hook.
#[derive(Debug, Clone)]
pub struct PluginContext {
    graph: ResourceGraph,
    runtime: Arc<dyn Runtime>,
    root: ResourceUrl,
    mode: BuildMode,
}

impl PluginContext {
    pub fn new(
        graph: ResourceGraph,
        runtime: Arc<dyn Runtime>,
        root: ResourceUrl,
        mode: BuildMode,
    ) -> Self {
        Self {
            graph,
            runtime,
            root,
            mode,
        }
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Directory URL that entries and root-relative specifiers resolve against.
    pub fn root(&self) -> &ResourceUrl {
        &self.root
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }
}

/// Hot-update declaration made while transforming a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotDeclaration {
    AcceptSelf,
    Decline,
    /// Specifiers as authored; the engine resolves them.
    AcceptDependencies(Vec<String>),
}

/// Mutable state threaded through the transform chain.
///
/// Besides the content itself, plugins report what they discover here: outgoing
/// references, the hot declaration and the names the resource exposes.
#[derive(Debug, Clone)]
pub struct TransformState {
    url: ResourceUrl,
    kind: ResourceKind,
    content: Content,
    content_type: String,
    references: Vec<Reference>,
    hot: Option<HotDeclaration>,
    exposed: Vec<String>,
}

impl TransformState {
    pub fn new(
        url: ResourceUrl,
        kind: ResourceKind,
        content: Content,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            url,
            kind,
            content,
            content_type: content_type.into(),
            references: Vec::new(),
            hot: None,
            exposed: Vec::new(),
        }
    }

    pub fn url(&self) -> &ResourceUrl {
        &self.url
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ResourceKind) {
        self.kind = kind;
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Replace the content, carrying reported spans over to the new text.
    ///
    /// A span inside the unchanged head or tail of the text is kept or shifted.
    /// One inside the edited region is relocated by searching for its specifier
    /// text; if that fails the span is dropped and the versioner reports it.
    pub fn set_content(&mut self, content: impl Into<Content>) {
        let content = content.into();
        match (self.content.as_text(), content.as_text()) {
            (Some(old), Some(new)) => {
                let mut cursor = 0;
                for reference in &mut self.references {
                    if let Some(span) = reference.span.take() {
                        reference.span = relocate_span(old, new, span, &mut cursor);
                    }
                }
            }
            _ => {
                for reference in &mut self.references {
                    reference.span = None;
                }
            }
        }
        self.content = content;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_content(Content::Text(text.into()));
    }

    /// Report an outgoing reference. Its source is always this resource.
    pub fn add_reference(&mut self, reference: Reference) {
        self.references.push(reference.with_source(self.url.clone()));
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn accept_self(&mut self) {
        if self.hot != Some(HotDeclaration::Decline) {
            self.hot = Some(HotDeclaration::AcceptSelf);
        }
    }

    /// Declining wins over any accept declaration.
    pub fn decline(&mut self) {
        self.hot = Some(HotDeclaration::Decline);
    }

    pub fn accept_dependencies<I, S>(&mut self, specifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.hot.is_none() {
            self.hot = Some(HotDeclaration::AcceptDependencies(Vec::new()));
        }
        if let Some(HotDeclaration::AcceptDependencies(existing)) = &mut self.hot {
            for specifier in specifiers {
                let specifier = specifier.into();
                if !existing.contains(&specifier) {
                    existing.push(specifier);
                }
            }
        }
    }

    pub fn hot(&self) -> Option<&HotDeclaration> {
        self.hot.as_ref()
    }

    pub fn expose(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.exposed.contains(&name) {
            self.exposed.push(name);
        }
    }

    pub fn exposed(&self) -> &[String] {
        &self.exposed
    }

    pub(crate) fn into_parts(self) -> TransformOutput {
        TransformOutput {
            kind: self.kind,
            content: self.content,
            content_type: self.content_type,
            references: self.references,
            hot: self.hot,
            exposed: self.exposed,
        }
    }
}

/// Where `span` of `old` lands in `new`. `cursor` keeps searches in authored order.
fn relocate_span(old: &str, new: &str, span: Range<usize>, cursor: &mut usize) -> Option<Range<usize>> {
    if span.end > old.len() || !old.is_char_boundary(span.start) || !old.is_char_boundary(span.end) {
        return None;
    }
    let (old_bytes, new_bytes) = (old.as_bytes(), new.as_bytes());
    let prefix = old_bytes
        .iter()
        .zip(new_bytes)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_bytes[prefix..]
        .iter()
        .rev()
        .zip(new_bytes[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let relocated = if span.end <= prefix {
        Some(span.clone())
    } else if span.start >= old.len() - suffix {
        let start = span.start + new.len() - old.len();
        Some(start..start + span.len())
    } else {
        let needle = &old[span.clone()];
        let from = (*cursor).min(new.len());
        new.get(from..)
            .and_then(|rest| rest.find(needle))
            .map(|offset| from + offset..from + offset + needle.len())
    };
    if let Some(found) = &relocated {
        *cursor = found.end;
    }
    relocated
}

pub(crate) struct TransformOutput {
    pub kind: ResourceKind,
    pub content: Content,
    pub content_type: String,
    pub references: Vec<Reference>,
    pub hot: Option<HotDeclaration>,
    pub exposed: Vec<String>,
}

/// Input to `finalize_content`.
#[derive(Debug, Clone)]
pub struct FinalizeInput {
    pub url: ResourceUrl,
    pub kind: ResourceKind,
    /// Content with every reference already rewritten to its final spelling.
    pub content: Content,
    pub content_type: String,
    /// Unversioned, root-relative public URL (`/src/app.js`).
    pub public_url: String,
    pub is_entry: bool,
}

/// Input to `format_referenced_specifier`.
#[derive(Debug, Clone, Copy)]
pub struct FormatInput<'a> {
    pub reference: &'a Reference,
    /// Public URL of the resource containing the reference.
    pub from_public_url: &'a str,
    pub target_url: &'a ResourceUrl,
    /// Final public URL of the target (versioned when versioning is on).
    pub target_public_url: &'a str,
}
