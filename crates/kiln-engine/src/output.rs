//! Finalized output and writing it out.
//!
//! Every output path is validated before anything is written, so a path with
//! `..` components can never escape the output directory.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kiln_graph::{Content, ResourceUrl, Runtime};
use path_clean::PathClean;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::versioning::IndirectionTable;

/// Name of the standalone import map written when an entry is not markup.
pub const IMPORT_MAP_FILE: &str = "importmap.json";

/// One file of the finalized tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub content: Content,
    pub content_type: String,
    /// Resource the file was produced from.
    pub source_url: ResourceUrl,
}

/// Result of [`crate::BuildSession::finalize_all`].
#[derive(Debug, Clone, Default)]
pub struct FinalizedOutput {
    /// Output files keyed by path relative to the output directory, in dependency order.
    pub files: IndexMap<String, OutputFile>,
    pub indirection: IndirectionTable,
    /// Reference cycles found while ordering the graph.
    pub cycles: Vec<Vec<ResourceUrl>>,
}

impl FinalizedOutput {
    /// Output path of the file produced from `url`.
    pub fn path_of(&self, url: &ResourceUrl) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, file)| &file.source_url == url)
            .map(|(path, _)| path.as_str())
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.files.get(path).and_then(|file| file.content.as_text())
    }

    /// Write every file under `dir` through `runtime`. Returns the written paths.
    pub async fn write_to(&self, runtime: &dyn Runtime, dir: &Path) -> Result<Vec<PathBuf>> {
        let dir = normalize_dir(runtime, dir)?;

        let mut operations = Vec::with_capacity(self.files.len());
        for (name, file) in &self.files {
            operations.push((validate_output_path(&dir, name)?, file.content.as_bytes()));
        }

        runtime
            .create_dir(&dir, true)
            .await
            .map_err(|e| EngineError::Runtime(format!("failed to create '{}': {e}", dir.display())))?;

        let mut written = Vec::with_capacity(operations.len());
        for (path, bytes) in operations {
            if let Some(parent) = path.parent() {
                if !runtime.exists(parent) {
                    runtime.create_dir(parent, true).await.map_err(|e| {
                        EngineError::Runtime(format!("failed to create '{}': {e}", parent.display()))
                    })?;
                }
            }
            runtime
                .write_file(&path, bytes)
                .await
                .map_err(|e| EngineError::Runtime(format!("failed to write '{}': {e}", path.display())))?;
            written.push(path);
        }

        debug!(dir = %dir.display(), files = written.len(), "wrote output");
        Ok(written)
    }
}

fn normalize_dir(runtime: &dyn Runtime, dir: &Path) -> Result<PathBuf> {
    let cleaned = dir.clean();
    if cleaned.is_absolute() {
        return Ok(cleaned);
    }
    let cwd = runtime
        .get_cwd()
        .map_err(|e| EngineError::InvalidOutputPath(format!("failed to get current directory: {e}")))?;
    Ok(cwd.join(cleaned).clean())
}

/// Resolve `name` under `base`, rejecting anything that escapes it.
fn validate_output_path(base: &Path, name: &str) -> Result<PathBuf> {
    if name.contains('\0') {
        return Err(EngineError::InvalidOutputPath(
            "file name contains a null byte".to_string(),
        ));
    }
    let full = base.join(Path::new(name).clean()).clean();
    if !full.starts_with(base) || full == base {
        return Err(EngineError::InvalidOutputPath(format!(
            "'{name}' escapes output directory '{}'",
            base.display()
        )));
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use kiln_graph::MemoryRuntime;

    use super::*;

    fn output_with(name: &str) -> FinalizedOutput {
        let mut output = FinalizedOutput::default();
        output.files.insert(
            name.to_string(),
            OutputFile {
                content: Content::from("x"),
                content_type: "text/javascript".into(),
                source_url: ResourceUrl::new_virtual("/a.js"),
            },
        );
        output
    }

    #[test]
    fn nested_paths_stay_inside() {
        let base = Path::new("/tmp/out");
        assert_eq!(
            validate_output_path(base, "assets/app.js").unwrap(),
            Path::new("/tmp/out/assets/app.js")
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let base = Path::new("/tmp/out");
        assert!(validate_output_path(base, "../../etc/passwd").is_err());
        assert!(validate_output_path(base, "a/../../x").is_err());
        assert!(validate_output_path(base, "bad\0name").is_err());
    }

    #[tokio::test]
    async fn writes_through_runtime() {
        let runtime = MemoryRuntime::new("/work");
        let written = output_with("js/a.1234abcd.js")
            .write_to(&runtime, Path::new("dist"))
            .await
            .unwrap();
        assert_eq!(written, vec![PathBuf::from("/work/dist/js/a.1234abcd.js")]);
        assert_eq!(
            runtime.read_to_string("/work/dist/js/a.1234abcd.js").as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn escaping_file_aborts_before_writing() {
        let runtime = MemoryRuntime::new("/work");
        let result = output_with("../escape.js")
            .write_to(&runtime, Path::new("/work/dist"))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidOutputPath(_))));
        assert!(runtime.paths().is_empty());
    }
}
