//! Subcommand implementations.

pub mod trust;
pub mod validate;

use colored::Colorize;
use devprov_common::{CheckIssue, Severity};

/// Print findings to the error stream, remediation commands included.
pub(crate) fn print_issues(issues: &[CheckIssue]) {
    for issue in issues {
        let marker = match issue.severity {
            Severity::Error => "✗".red().to_string(),
            Severity::Warning => "!".yellow().to_string(),
            Severity::Info => "·".dimmed().to_string(),
        };
        eprintln!("{} [{}] {}", marker, issue.check, issue.message);
        if let Some(cmd) = &issue.remediation {
            eprintln!("      fix: {}", cmd.yellow());
        }
    }
}

/// One status line per check.
pub(crate) fn print_check(label: &str, ok: bool) {
    let status = if ok {
        "ok".green().to_string()
    } else {
        "FAILED".red().to_string()
    };
    println!("  {} {}: {}", "→".dimmed(), label, status);
}
