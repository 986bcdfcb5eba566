//! End of run summary

use crate::config::LogLevel;
use crate::orchestration::{PreprocessResult, ProducedArtifact};
use console::style;

fn produced_line(tag: &str, produced: &ProducedArtifact) -> String {
    format!(
        "  {} {} -> {}",
        style(tag).green(),
        produced.source.display(),
        produced.output.display()
    )
}

/// Lines describing a finished run.
///
/// Unresolved artifacts and failures are always listed. Individual outputs
/// are listed from `--verbose` on. At `--silent` a successful run prints
/// nothing.
pub fn render(result: &PreprocessResult, level: LogLevel) -> Vec<String> {
    let mut lines = Vec::new();

    if level == LogLevel::Fatal && result.is_success() {
        return lines;
    }

    if level >= LogLevel::Debug {
        lines.extend(result.transformed.iter().map(|p| produced_line("[OK]", p)));
        lines.extend(result.cached.iter().map(|p| produced_line("[CACHED]", p)));
        lines.extend(result.passed_through.iter().map(|p| {
            format!("  {} {} (signed, left untouched)", style("[SKIP]").dim(), p.display())
        }));
    }

    for unresolved in &result.unresolved {
        lines.push(format!("  {} {}", style("[WARN]").yellow(), unresolved));
    }
    for failure in &result.failures {
        lines.push(format!("  {} {}", style("[FAIL]").red(), failure));
    }

    let counts = format!(
        "{} transformed, {} cached, {} passed through, {} unresolved, {} failed",
        result.transformed.len(),
        result.cached.len(),
        result.passed_through.len(),
        result.unresolved.len(),
        result.failures.len()
    );

    if result.is_success() {
        lines.push(format!("{} Preprocessing finished: {}", style("[OK]").green(), counts));
    } else {
        lines.push(format!("{} Preprocessing failed: {}", style("[ERROR]").red(), counts));
    }

    lines
}

/// Print the summary of a finished run to stdout
pub fn print_summary(result: &PreprocessResult, level: LogLevel) {
    for line in render(result, level) {
        println!("{}", line);
    }
}
