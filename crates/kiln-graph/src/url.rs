use std::fmt;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const FILE_PREFIX: &str = "file://";
const VIRTUAL_PREFIX: &str = "virtual:";

/// Scheme of a [`ResourceUrl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlScheme {
    /// Backed by the filesystem (`file:///abs/path`).
    File,
    /// Served from memory (`virtual:/path`).
    Virtual,
}

/// Canonical identifier for a resource in the graph.
///
/// Every URL carries a scheme and a cleaned, absolute, `/`-separated path, so two
/// spellings of the same location (`./a/../b.js` vs `b.js`) compare equal. Inline
/// resources extracted from a parent keep the parent's scheme and path with a
/// `@L<line>C<column>.<ext>` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceUrl(String);

impl ResourceUrl {
    /// Create a `file://` URL from an absolute filesystem path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UrlError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(UrlError::Empty);
        }
        if !path.is_absolute() {
            return Err(UrlError::RelativePath(path.to_path_buf()));
        }
        Ok(Self::with_scheme(UrlScheme::File, &slash_path(&path.clean())))
    }

    /// Create a `virtual:` URL. The `virtual:` prefix is optional.
    pub fn new_virtual(id: impl AsRef<str>) -> Self {
        let id = id.as_ref();
        let path = id.strip_prefix(VIRTUAL_PREFIX).unwrap_or(id);
        Self::with_scheme(UrlScheme::Virtual, path)
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(text: &str) -> Result<Self, UrlError> {
        if text.is_empty() {
            return Err(UrlError::Empty);
        }
        if let Some(path) = text.strip_prefix(FILE_PREFIX) {
            Ok(Self::with_scheme(UrlScheme::File, path))
        } else if text.starts_with(VIRTUAL_PREFIX) {
            Ok(Self::new_virtual(text))
        } else {
            Err(UrlError::UnsupportedScheme(text.to_string()))
        }
    }

    /// URL for content embedded in `parent` at the given line and column.
    pub fn inline(parent: &ResourceUrl, line: u32, column: u32, extension: &str) -> Self {
        Self(format!("{}@L{line}C{column}.{extension}", parent.0))
    }

    fn with_scheme(scheme: UrlScheme, path: &str) -> Self {
        let rooted = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let cleaned = slash_path(&PathBuf::from(rooted).clean());
        match scheme {
            UrlScheme::File => Self(format!("{FILE_PREFIX}{cleaned}")),
            UrlScheme::Virtual => Self(format!("{VIRTUAL_PREFIX}{cleaned}")),
        }
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> UrlScheme {
        if self.0.starts_with(FILE_PREFIX) {
            UrlScheme::File
        } else {
            UrlScheme::Virtual
        }
    }

    pub fn is_file(&self) -> bool {
        self.scheme() == UrlScheme::File
    }

    pub fn is_virtual(&self) -> bool {
        self.scheme() == UrlScheme::Virtual
    }

    /// Borrow the full textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The absolute path portion, always starting with `/`.
    pub fn path(&self) -> &str {
        match self.scheme() {
            UrlScheme::File => &self.0[FILE_PREFIX.len()..],
            UrlScheme::Virtual => &self.0[VIRTUAL_PREFIX.len()..],
        }
    }

    /// Filesystem path for `file://` URLs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.is_file().then(|| PathBuf::from(self.path()))
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        let path = self.path();
        path.rsplit_once('/').map_or(path, |(_, name)| name)
    }

    /// Extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Resolve `specifier` against the directory containing this resource.
    ///
    /// Query strings and fragments are dropped.
    pub fn join(&self, specifier: &str) -> Self {
        let dir = self
            .path()
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir);
        self.child(dir, specifier)
    }

    /// Resolve `specifier` treating this URL as a directory.
    pub fn join_dir(&self, specifier: &str) -> Self {
        self.child(self.path().trim_end_matches('/'), specifier)
    }

    fn child(&self, dir: &str, specifier: &str) -> Self {
        let specifier = strip_suffixes(specifier);
        let joined = if specifier.starts_with('/') {
            specifier.to_string()
        } else {
            format!("{dir}/{specifier}")
        };
        Self::with_scheme(self.scheme(), &joined)
    }

    /// Path of this URL relative to `root`, when it lives underneath it.
    pub fn relative_to(&self, root: &ResourceUrl) -> Option<&str> {
        if self.scheme() != root.scheme() {
            return None;
        }
        let base = root.path().trim_end_matches('/');
        self.path().strip_prefix(base)?.strip_prefix('/')
    }
}

fn strip_suffixes(specifier: &str) -> &str {
    specifier
        .split(['?', '#'])
        .next()
        .unwrap_or(specifier)
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ResourceUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        ResourceUrl::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Error type for `ResourceUrl` construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The provided text or path was empty.
    #[error("resource url is empty")]
    Empty,

    /// Filesystem URLs need an absolute path.
    #[error("cannot build a file url from relative path '{}'", .0.display())]
    RelativePath(PathBuf),

    /// Only `file://` and `virtual:` are understood.
    #[error("unsupported url scheme in '{0}'")]
    UnsupportedScheme(String),
}
