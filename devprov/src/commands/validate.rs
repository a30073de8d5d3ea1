//! `devprov validate` - repository configuration validation.

use anyhow::{Context, Result};
use colored::Colorize;
use devprov_common::{GitCli, RepoValidation, SshCli, ValidateOptions, validate_repository};
use std::path::PathBuf;
use tracing::info;

use super::{print_check, print_issues};

pub async fn run(
    remote: String,
    shared_config: PathBuf,
    key_host: String,
    probe_user: String,
    repo: Option<PathBuf>,
    json: bool,
) -> Result<bool> {
    let opts = ValidateOptions {
        shared_config,
        remote,
        key_host,
        probe_user,
    };
    let vcs = match repo {
        Some(dir) => GitCli::in_dir(dir),
        None => GitCli::new(),
    };

    info!(remote = %opts.remote, "validating repository configuration");
    let report = validate_repository(&vcs, &SshCli, &opts)
        .await
        .context("repository validation aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.passed());
    }

    print_report(&report);
    Ok(report.passed())
}

fn print_report(report: &RepoValidation) {
    println!("{}", "Repository configuration".bold());
    print_check("shared config include", report.shared_config_ok);
    print_check("commit signing", report.signing_ok);
    print_check("author identity", report.identity_ok);
    print_check("origin transport", report.origin_ok);

    if let (Some(name), Some(email)) = (&report.user_name, &report.user_email) {
        println!("  {} committing as {} <{}>", "→".dimmed(), name, email);
    }
    if let Some(url) = &report.origin_url {
        println!("  {} origin: {}", "→".dimmed(), url);
    }

    print_issues(&report.issues);

    println!();
    if report.passed() {
        println!("{} repository configuration OK", "✓".green());
    } else {
        eprintln!(
            "{} repository configuration needs attention; apply the fixes above and re-run",
            "✗".red()
        );
    }
}
