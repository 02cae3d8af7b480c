//! Reference traces: the chain of references that led to a resource.
//!
//! Every error the engine reports carries one, so a failure deep in the graph
//! reads as a path from the entry request down to the offending reference.

use std::fmt;

use crate::reference::{Reference, ReferenceKind, SourcePosition};
use crate::url::ResourceUrl;

/// One hop in a [`ReferenceTrace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub specifier: String,
    pub kind: ReferenceKind,
    pub source_url: Option<ResourceUrl>,
    pub position: SourcePosition,
}

impl From<&Reference> for TraceFrame {
    fn from(reference: &Reference) -> Self {
        Self {
            specifier: reference.specifier.clone(),
            kind: reference.kind,
            source_url: reference.source_url.clone(),
            position: reference.position,
        }
    }
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_url {
            Some(source) => write!(
                f,
                "\"{}\" ({}) at {source}:{}",
                self.specifier, self.kind, self.position
            ),
            None => write!(f, "\"{}\" (entry)", self.specifier),
        }
    }
}

/// Chain of references from an entry request to the current resource, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceTrace {
    frames: Vec<TraceFrame>,
}

impl ReferenceTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace starting at `reference`.
    pub fn start(reference: &Reference) -> Self {
        Self {
            frames: vec![TraceFrame::from(reference)],
        }
    }

    /// Copy of this trace extended by `reference`.
    pub fn with(&self, reference: &Reference) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.extend(self.frames.iter().cloned());
        frames.push(TraceFrame::from(reference));
        Self { frames }
    }

    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    /// The reference closest to the failure.
    pub fn innermost(&self) -> Option<&TraceFrame> {
        self.frames.last()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Single-line form: `"main.js" -> "./a.js" -> "./missing.js"`.
    pub fn format_chain(&self) -> String {
        self.frames
            .iter()
            .map(|frame| format!("\"{}\"", frame.specifier))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl fmt::Display for ReferenceTrace {
    /// Innermost frame first, like a stack trace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, frame) in self.frames.iter().rev().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  at {frame}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_innermost_first() {
        let main = ResourceUrl::new_virtual("/main.js");
        let entry = Reference::entry("main.js");
        let missing = Reference::new("./missing.js", ReferenceKind::ModuleImport)
            .with_source(main)
            .at(SourcePosition::new(2, 1));

        let trace = ReferenceTrace::start(&entry).with(&missing);
        let rendered = trace.to_string();
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("./missing.js"));
        assert!(lines[0].contains("main.js:2:1"));
        assert!(lines[1].contains("(entry)"));
        assert_eq!(trace.format_chain(), "\"main.js\" -> \"./missing.js\"");
    }
}
