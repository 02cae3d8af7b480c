//! Sizes, durations and the build summary.

use std::time::Duration;

use owo_colors::OwoColorize;

use super::colors_enabled;

/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One line per written file, then the total.
pub fn print_build_summary(files: &[(String, u64)], elapsed: Duration) {
    let total: u64 = files.iter().map(|(_, size)| size).sum();
    for (name, size) in files {
        if colors_enabled() {
            eprintln!("  {} {} {}", "▸".blue(), name.bold(), format_size(*size).dimmed());
        } else {
            eprintln!("  ▸ {name} {}", format_size(*size));
        }
    }
    let summary = format!(
        "{} files, {} in {}",
        files.len(),
        format_size(total),
        format_duration(elapsed)
    );
    if colors_enabled() {
        eprintln!("  {}", summary.green());
    } else {
        eprintln!("  {summary}");
    }
}
