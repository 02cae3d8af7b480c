use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static HEAD_OPEN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)<head\b[^>]*>"));

/// Import-map shaped table from placeholder to final versioned URL.
///
/// Holds exactly the placeholders the versioning pass emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectionTable {
    imports: BTreeMap<String, String>,
}

impl IndirectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: impl Into<String>, target: impl Into<String>) {
        self.imports.insert(placeholder.into(), target.into());
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.imports.get(placeholder).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.imports
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// `{"imports": {...}}`
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{\"imports\":{}}".to_string())
    }

    /// Insert the table as a `<script type="importmap">` at the top of `<head>`.
    ///
    /// Falls back to prepending when the document has no head.
    pub fn inject_html(&self, html: &str) -> String {
        let script = format!(
            "\n<script type=\"importmap\">{}</script>",
            serde_json::to_string(self).unwrap_or_else(|_| "{\"imports\":{}}".to_string())
        );
        let head_end = HEAD_OPEN
            .as_ref()
            .ok()
            .and_then(|re| re.find(html))
            .map(|m| m.end());
        match head_end {
            Some(at) => format!("{}{script}{}", &html[..at], &html[at..]),
            None => format!("{}\n{html}", script.trim_start()),
        }
    }
}
