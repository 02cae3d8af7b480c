//! Engine errors.

use kiln_graph::{GraphError, ReferenceTrace, ResourceUrl};

use crate::plugins::HookName;

/// Errors produced while fetching, updating or finalizing resources.
///
/// `Clone` because a coalesced compute hands the same outcome to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// No plugin resolved the specifier.
    #[error("cannot resolve \"{specifier}\"\n{trace}")]
    Resolution {
        specifier: String,
        trace: ReferenceTrace,
    },

    /// The resource was resolved but has no content.
    #[error("resource not found: {url}\n{trace}")]
    NotFound {
        url: ResourceUrl,
        trace: ReferenceTrace,
    },

    /// The loaded resource does not match what the reference expected.
    #[error("{url} is {actual}, but the reference expects {expected}\n{trace}")]
    ContractViolation {
        url: ResourceUrl,
        expected: String,
        actual: String,
        trace: ReferenceTrace,
    },

    /// A plugin hook returned an error.
    #[error("plugin \"{plugin}\" failed during {hook}: {message}\n{trace}")]
    Plugin {
        plugin: String,
        hook: HookName,
        message: String,
        trace: ReferenceTrace,
    },

    /// The graph rejected a mutation. Indicates an engine bug.
    #[error("{source}\n{trace}")]
    StaleNode {
        source: GraphError,
        trace: ReferenceTrace,
    },

    /// Runtime failure outside any plugin (writing output).
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An output file would land outside the output directory.
    #[error("invalid output path: {0}")]
    InvalidOutputPath(String),

    /// A spawned compute task panicked or was aborted.
    #[error("compute task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    /// The reference chain that led to the failure, when one is known.
    pub fn trace(&self) -> Option<&ReferenceTrace> {
        match self {
            Self::Resolution { trace, .. }
            | Self::NotFound { trace, .. }
            | Self::ContractViolation { trace, .. }
            | Self::Plugin { trace, .. }
            | Self::StaleNode { trace, .. } => Some(trace),
            Self::Runtime(_) | Self::InvalidOutputPath(_) | Self::TaskFailed(_) => None,
        }
    }

    /// Short machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "resolution",
            Self::NotFound { .. } => "not-found",
            Self::ContractViolation { .. } => "contract-violation",
            Self::Plugin { .. } => "plugin",
            Self::StaleNode { .. } => "stale-node",
            Self::Runtime(_) => "runtime",
            Self::InvalidOutputPath(_) => "invalid-output-path",
            Self::TaskFailed(_) => "task-failed",
        }
    }
}

/// Result type alias for kiln-engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
