//! Logging setup for applications embedding kiln.
//!
//! Only available with the `logging` feature. Library code emits `tracing`
//! events and leaves the subscriber to the application.

use std::fmt;
use std::str::FromStr;
use std::sync::Once;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Targets whose verbosity [`LogLevel`] controls.
const KILN_TARGETS: &[&str] = &["kiln_graph", "kiln_engine"];

/// Verbosity of kiln's own events. Other crates stay at `warn`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    /// Includes per-resource cache hits and resolutions.
    Trace,
}

impl LogLevel {
    const NAMES: [(&'static str, LogLevel); 6] = [
        ("off", LogLevel::Silent),
        ("error", LogLevel::Error),
        ("warn", LogLevel::Warn),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("trace", LogLevel::Trace),
    ];

    fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(_, level)| *level == self)
            .map_or("info", |(name, _)| *name)
    }

    /// `warn` globally, `self` for kiln's own targets.
    fn directives(self) -> String {
        let mut directives = vec!["warn".to_string()];
        directives.extend(KILN_TARGETS.iter().map(|target| format!("{target}={}", self.name())));
        directives.join(",")
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let alias = match lowered.as_str() {
            "silent" => "off",
            "warning" => "warn",
            other => other,
        };
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, level)| *level)
            .ok_or_else(|| format!("invalid log level: {s}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Install a global subscriber at `level`. `RUST_LOG` directives are added on top.
///
/// Only the first call in a process has an effect.
///
/// ```rust,no_run
/// use kiln_engine::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    let mut filter = EnvFilter::new(level.directives());
    if let Ok(extra) = std::env::var(EnvFilter::DEFAULT_ENV) {
        for directive in extra.split(',').filter_map(|d| d.parse::<Directive>().ok()) {
            filter = filter.add_directive(directive);
        }
    }
    install(filter);
}

/// Install a global subscriber configured by `RUST_LOG`, falling back to [`LogLevel::Info`].
pub fn init_logging_from_env() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::Info.directives()));
    install(filter);
}

fn install(filter: EnvFilter) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer::layer().compact().with_target(false).without_time())
            .try_init();
    });
}
