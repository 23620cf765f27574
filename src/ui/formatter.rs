//! Pure formatting functions for UI output.
//!
//! Formatting is kept separate from printing so it can be tested; the
//! `display_*` functions only print what the `format_*` functions build.

use crate::orchestration::ReleaseOutcome;
use crate::preflight::PreflightFinding;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a preflight finding that did not stop the release.
pub fn display_finding(finding: &PreflightFinding) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), finding);
}

/// Lines summarizing a finished run, without styling.
///
/// # Arguments
/// * `outcome` - Result of the release run
pub fn format_release_summary(outcome: &ReleaseOutcome) -> Vec<String> {
    let mut lines = Vec::new();

    if outcome.dry_run {
        lines.push(format!(
            "Dry run: would release {} (currently {})",
            outcome.release_version, outcome.previous_version
        ));
        lines.push("Nothing was committed, tagged or pushed; review the working tree".to_string());
        return lines;
    }

    lines.push(format!(
        "Released {} (from {})",
        outcome.release_version, outcome.previous_version
    ));
    if let Some(tag) = &outcome.tag {
        lines.push(format!("Tag: {}", tag));
    }
    if let Some(next) = &outcome.next_version {
        lines.push(format!("Next version: {}", next));
    }
    lines
}

/// Display the release summary; the first line is the headline.
pub fn display_release_summary(outcome: &ReleaseOutcome) {
    for finding in &outcome.warnings {
        display_finding(finding);
    }

    let lines = format_release_summary(outcome);
    let mut iter = lines.iter();
    if let Some(headline) = iter.next() {
        if outcome.dry_run {
            display_status(headline);
        } else {
            display_success(headline);
        }
    }
    for line in iter {
        println!("  {}", style(line).dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Version;

    fn outcome(dry_run: bool) -> ReleaseOutcome {
        ReleaseOutcome {
            previous_version: Version::parse("0.3.0-SNAPSHOT").unwrap(),
            release_version: Version::parse("0.3.0").unwrap(),
            next_version: if dry_run {
                None
            } else {
                Some(Version::parse("0.3.1-SNAPSHOT").unwrap())
            },
            tag: if dry_run { None } else { Some("v0.3.0".to_string()) },
            dry_run,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_format_release_summary() {
        assert_eq!(
            format_release_summary(&outcome(false)),
            vec![
                "Released 0.3.0 (from 0.3.0-SNAPSHOT)".to_string(),
                "Tag: v0.3.0".to_string(),
                "Next version: 0.3.1-SNAPSHOT".to_string(),
            ]
        );
    }

    #[test]
    fn test_format_dry_run_summary() {
        let lines = format_release_summary(&outcome(true));
        assert_eq!(lines[0], "Dry run: would release 0.3.0 (currently 0.3.0-SNAPSHOT)");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_display_functions() {
        // Visual verification test - output is printed to stdout/stderr
        display_error("test error");
        display_success("test success");
        display_status("test status");
        display_finding(&PreflightFinding::PullNeeded { commits: 2 });
        display_release_summary(&outcome(false));
    }
}
