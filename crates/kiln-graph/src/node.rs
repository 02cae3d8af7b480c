//! Resource nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::url::ResourceUrl;

/// What a resource is, as far as the engine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// JavaScript module.
    Module,
    /// HTML document.
    Markup,
    /// Stylesheet.
    Style,
    /// Anything copied through untouched (images, fonts, json).
    Asset,
    /// Content extracted from a parent resource.
    InlineVirtual,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Markup => "markup",
            Self::Style => "style",
            Self::Asset => "asset",
            Self::InlineVirtual => "inline-virtual",
        }
    }

    /// Guess a kind from a content type essence.
    pub fn from_content_type(content_type: &str) -> Self {
        match essence(content_type).as_str() {
            "text/javascript" | "application/javascript" | "text/typescript" => Self::Module,
            "text/html" => Self::Markup,
            "text/css" => Self::Style,
            _ => Self::Asset,
        }
    }

    /// Guess a kind from a URL's extension.
    pub fn from_url(url: &ResourceUrl) -> Self {
        Self::from_content_type(content_type_for_extension(url.extension().unwrap_or("")))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased content type without parameters.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Content type registered for a file extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "text/javascript",
        "ts" | "mts" | "tsx" => "text/typescript",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" | "md" => "text/plain",
        "xml" => "application/xml",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Whether content of this type should be held as text.
pub fn is_textual(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence.starts_with("text/")
        || matches!(
            essence.as_str(),
            "application/javascript" | "application/json" | "application/xml" | "image/svg+xml"
        )
}

/// Resource payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    /// Build content from raw bytes, keeping text when the type is textual and valid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>, content_type: &str) -> Self {
        if is_textual(content_type) {
            match String::from_utf8(bytes) {
                Ok(text) => Self::Text(text),
                Err(err) => Self::Bytes(err.into_bytes()),
            }
        } else {
            Self::Bytes(bytes)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Hot-update declaration made by a resource's content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HotState {
    /// No declaration; updates bubble to dependents.
    #[default]
    Unspecified,
    /// Any update reaching this resource forces a full reload.
    Declines,
    /// The resource can re-execute itself in place.
    AcceptsSelf,
    /// The resource absorbs updates of the listed dependencies.
    AcceptsDependencies(Vec<ResourceUrl>),
}

impl HotState {
    pub fn accepts_dependency(&self, url: &ResourceUrl) -> bool {
        match self {
            Self::AcceptsDependencies(urls) => urls.contains(url),
            _ => false,
        }
    }
}

/// Identity of one materialisation of a node. A node removed and re-added gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeInstance(pub u64);

impl fmt::Display for NodeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource in the graph.
///
/// Nodes are immutable once published; the graph swaps in a new `Arc` on every
/// update, so readers holding an older `Arc` keep a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub url: ResourceUrl,
    pub kind: ResourceKind,
    /// Content after the transform chain.
    pub content: Content,
    pub content_type: String,
    /// Content as loaded, before any transform ran.
    pub original_content: Option<Content>,
    pub hot_state: HotState,
    /// Names the resource makes available to dependents.
    pub exposed: Vec<String>,
    /// Fingerprint assigned when versioning is active.
    pub version: Option<String>,
    /// Unversioned placeholder emitted for this node inside a cycle.
    pub placeholder: Option<String>,
    /// BLAKE3 of the loaded content, used to skip no-op changes.
    pub source_hash: Option<[u8; 32]>,
    pub is_entry: bool,
    pub instance: NodeInstance,
}

impl ResourceNode {
    /// A node that has been registered but not yet computed.
    pub fn new(url: ResourceUrl, kind: ResourceKind, instance: NodeInstance) -> Self {
        Self {
            url,
            kind,
            content: Content::default(),
            content_type: String::new(),
            original_content: None,
            hot_state: HotState::default(),
            exposed: Vec::new(),
            version: None,
            placeholder: None,
            source_hash: None,
            is_entry: false,
            instance,
        }
    }
}

/// Output of one compute, committed atomically by the graph.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub kind: Option<ResourceKind>,
    pub content: Content,
    pub content_type: String,
    pub original_content: Option<Content>,
    pub hot_state: HotState,
    pub exposed: Vec<String>,
    pub source_hash: Option<[u8; 32]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        let js = ResourceUrl::new_virtual("/a.mjs");
        let css = ResourceUrl::new_virtual("/a.css");
        let png = ResourceUrl::new_virtual("/a.png");
        assert_eq!(ResourceKind::from_url(&js), ResourceKind::Module);
        assert_eq!(ResourceKind::from_url(&css), ResourceKind::Style);
        assert_eq!(ResourceKind::from_url(&png), ResourceKind::Asset);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            ResourceKind::from_content_type("Text/HTML; charset=utf-8"),
            ResourceKind::Markup
        );
    }

    #[test]
    fn binary_content_stays_bytes() {
        let content = Content::from_bytes(vec![0xff, 0x00], "image/png");
        assert!(content.as_text().is_none());
        let text = Content::from_bytes(b"body{}".to_vec(), "text/css");
        assert_eq!(text.as_text(), Some("body{}"));
    }

    #[test]
    fn accepts_dependency_matches_listed_urls() {
        let dep = ResourceUrl::new_virtual("/b.js");
        let state = HotState::AcceptsDependencies(vec![dep.clone()]);
        assert!(state.accepts_dependency(&dep));
        assert!(!HotState::AcceptsSelf.accepts_dependency(&dep));
    }
}
