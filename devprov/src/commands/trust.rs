//! `devprov trust-host` - SSH trust-store provisioning.

use anyhow::Result;
use colored::Colorize;
use devprov_common::{HostKeyMap, HostSpec, Paths, SshKeygen, TrustReport, provision_host};
use tracing::info;

use super::print_issues;

pub async fn run(raw_spec: &str, dry_run: bool, json: bool) -> Result<bool> {
    let spec = match HostSpec::parse(raw_spec) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("{} invalid host specification: {e}", "✗".red());
            std::process::exit(2);
        }
    };

    let keys = HostKeyMap::from_env(&spec.env_prefix());
    let paths = Paths::from_env();
    info!(host = %spec, dry_run, "provisioning trust store");
    let report = provision_host(&spec, &keys, &SshKeygen, &paths, dry_run).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.succeeded());
    }

    print_report(&report, &paths);
    Ok(report.succeeded())
}

fn print_report(report: &TrustReport, paths: &Paths) {
    let heading = if report.dry_run {
        format!("Trust store provisioning for {} (dry run)", report.domain)
    } else {
        format!("Trust store provisioning for {}", report.domain)
    };
    println!("{}", heading.bold());

    match &report.installed {
        Some(key) => println!(
            "  {} {} key installed for {} in {}",
            "→".dimmed(),
            key.algorithm,
            key.host_token,
            paths.known_hosts.display()
        ),
        None => println!(
            "  {} no {}_SSH_HOST_KEY_* material set; nothing to install",
            "→".dimmed(),
            report.env_prefix
        ),
    }

    if report.shortcut_written {
        println!(
            "  {} connection shortcut appended to {}",
            "→".dimmed(),
            paths.shortcut_file.display()
        );
    }
    if report.store_finalized {
        println!("  {} store deduplicated, hashed, and locked down", "→".dimmed());
    }

    print_issues(&report.issues);

    println!();
    if report.succeeded() {
        println!("{} trust store ready for {}", "✓".green(), report.domain);
    } else {
        eprintln!("{} trust store provisioning failed for {}", "✗".red(), report.domain);
    }
}
