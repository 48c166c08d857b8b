//! Formatting for sizes, durations and the build summary.

use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;

use super::colors_enabled;

/// Format a byte count with the largest fitting unit.
///
/// ```
/// use stax_cli::ui::format_size;
///
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
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// ```
/// use std::time::Duration;
/// use stax_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One line of the build summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub label: String,
    pub modules: usize,
    pub bytes: u64,
    pub duration: Duration,
}

impl SummaryRow {
    pub fn render(&self) -> String {
        format!(
            "{}: {} modules, {} ({})",
            self.label,
            self.modules,
            format_size(self.bytes),
            format_duration(self.duration)
        )
    }
}

/// Print the per-domain summary table to stderr.
pub fn print_build_summary(rows: &[SummaryRow]) {
    let width = (Term::stderr().size().1 as usize).min(60);
    let rule = "─".repeat(width);

    if colors_enabled() {
        eprintln!("\n{}", "Build Summary".bold().underline());
        eprintln!("{}", rule);
        for row in rows {
            eprintln!(
                "  {} {} {} {}",
                "▸".blue(),
                row.label.bright_white().bold(),
                format!("{} modules, {}", row.modules, format_size(row.bytes)).dimmed(),
                format!("({})", format_duration(row.duration)).dimmed()
            );
        }
        eprintln!("{}", rule);
    } else {
        eprintln!("\nBuild Summary");
        eprintln!("{}", rule);
        for row in rows {
            eprintln!("  ▸ {}", row.render());
        }
        eprintln!("{}", rule);
    }
}
