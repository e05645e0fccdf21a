//! Statistics report rendering.
//!
//! A pure consumer: invoked exactly once per successful command, never after
//! a load or resolution failure (those short-circuit before any
//! [`Statistics`] exists).

use std::io::Write;

use crate::engine::Statistics;
use crate::Result;

/// Write the human-readable generation report.
///
/// # Errors
/// Propagates write failures on the output stream.
pub fn render(statistics: &Statistics, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Test generation finished in {:.1?}.", statistics.elapsed)?;
    writeln!(out, "  tests generated:   {}", statistics.tests_generated)?;
    writeln!(out, "  errors found:      {}", statistics.errors_found)?;
    writeln!(out, "  steps taken:       {}", statistics.steps)?;
    writeln!(out, "  incomplete states: {}", statistics.incomplete_states)?;
    if let Some(coverage) = statistics.coverage_percent {
        writeln!(out, "  coverage:          {coverage:.2}%")?;
    }
    if let (Some(passed), Some(failed)) = (statistics.tests_passed, statistics.tests_failed) {
        writeln!(out, "  test run:          {passed} passed, {failed} failed")?;
    }
    Ok(())
}

/// Write the report as pretty-printed JSON instead.
///
/// # Errors
/// Propagates serialization and write failures.
pub fn render_json(statistics: &Statistics, out: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(statistics)
        .map_err(|e| crate::Error::Engine(format!("cannot serialize statistics: {e}")))?;
    writeln!(out, "{json}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> Statistics {
        Statistics {
            tests_generated: 12,
            errors_found: 3,
            steps: 4096,
            incomplete_states: 1,
            coverage_percent: Some(87.5),
            elapsed: Duration::from_secs(9),
            tests_passed: None,
            tests_failed: None,
        }
    }

    #[test]
    fn test_render_generation_report() {
        let mut out = Vec::new();
        render(&sample(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("tests generated:   12"));
        assert!(text.contains("errors found:      3"));
        assert!(text.contains("coverage:          87.50%"));
        assert!(!text.contains("test run:"));
    }

    #[test]
    fn test_render_run_statistics() {
        let mut statistics = sample();
        statistics.tests_passed = Some(10);
        statistics.tests_failed = Some(2);
        let mut out = Vec::new();
        render(&statistics, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("test run:          10 passed, 2 failed"));
    }

    #[test]
    fn test_render_json_skips_absent_fields() {
        let mut statistics = sample();
        statistics.coverage_percent = None;
        let mut out = Vec::new();
        render_json(&statistics, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"tests_generated\": 12"));
        assert!(!text.contains("coverage_percent"));
        assert!(!text.contains("tests_passed"));
    }
}
