//! Built-in plugins.
//!
//! - [`FileSystemPlugin`] resolves relative specifiers to `file://` URLs and reads them through the runtime.
//! - [`VirtualFilesPlugin`] serves in-memory files under `virtual:` URLs.
//! - [`ReferenceScannerPlugin`] discovers references in scripts, stylesheets and markup.

mod fs;
mod scanner;
mod virtual_files;

pub use fs::FileSystemPlugin;
pub use scanner::ReferenceScannerPlugin;
pub use virtual_files::{MAX_VIRTUAL_FILE_SIZE, VirtualFilesPlugin};

use kiln_graph::{Reference, ReferenceKind, ResourceUrl, UrlScheme};

/// Specifiers pointing outside the graph.
pub(crate) fn is_external(specifier: &str) -> bool {
    specifier.contains("://")
        || specifier.starts_with("//")
        || specifier.starts_with('#')
        || specifier.starts_with("data:")
        || specifier.starts_with("mailto:")
        || specifier.starts_with("javascript:")
}

fn is_bare(specifier: &str) -> bool {
    !(specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/'))
}

/// Resolve a path-like specifier for resources of `scheme`.
///
/// Entry specifiers and root-relative specifiers resolve against `root`; others
/// against the referencing resource. Bare module specifiers (package names) and
/// inline references are left to other plugins.
pub(crate) fn resolve_path_specifier(
    reference: &Reference,
    root: &ResourceUrl,
    scheme: UrlScheme,
) -> Option<ResourceUrl> {
    let specifier = reference.specifier.as_str();
    if specifier.is_empty()
        || reference.kind == ReferenceKind::InlineContent
        || is_external(specifier)
    {
        return None;
    }
    if reference.kind.is_module_specifier() && is_bare(specifier) {
        return None;
    }

    let resolved = match &reference.source_url {
        None => root.join_dir(specifier.trim_start_matches('/')),
        Some(_) if specifier.starts_with('/') => root.join_dir(specifier.trim_start_matches('/')),
        Some(source) => source.join(specifier),
    };
    (resolved.scheme() == scheme).then_some(resolved)
}
