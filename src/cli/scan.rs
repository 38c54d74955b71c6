use console::style;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::commands::ScanArgs;
use crate::cli::progress::ScanProgress;
use crate::config::{self, ScanConfig, ScanSettings};
use crate::errors::WardenError;
use crate::models::ScanReport;
use crate::pipeline::{ScanEvent, ScanOrchestrator};

pub async fn handle_scan(args: ScanArgs, show_progress: bool) -> Result<(), WardenError> {
    let config = build_scan_config(&args).await?;
    info!(
        tools = %config.tools.join(","),
        results_dir = %config.results_dir.display(),
        "Scan configuration resolved"
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<ScanEvent>();
    let orchestrator = ScanOrchestrator::new(config)
        .with_gitlab_token(args.sources.gitlab_token.clone())
        .with_event_channel(tx);

    let targets = orchestrator.discover_targets(&args.sources).await?;
    if !orchestrator.validate_targets(&targets) {
        return Err(WardenError::NoTargets);
    }

    let display = tokio::spawn(async move {
        let mut progress = ScanProgress::new(show_progress);
        while let Some(event) = rx.recv().await {
            progress.handle_event(&event);
        }
        progress.finish();
    });

    let outcome = orchestrator.run(&targets).await;
    let results_dir = orchestrator.config().results_dir.clone();
    drop(orchestrator);
    let _ = display.await;

    let report = outcome?;
    print_summary(&report, &results_dir);

    match report.failed_tool_count() {
        0 => Ok(()),
        n => Err(WardenError::ScanIncomplete(n)),
    }
}

/// Defaults, then config file, then profile, then command-line flags.
pub async fn build_scan_config(args: &ScanArgs) -> Result<ScanConfig, WardenError> {
    let file_layer = match &args.config {
        Some(path) => {
            let file = config::parse_config(path).await?;
            ScanSettings::from_config(&file, args.profile.as_deref())?
        }
        None => ScanSettings::default(),
    };

    let cli_layer = ScanSettings {
        tools: args.tools.clone(),
        results_dir: args.results_dir.clone(),
        timeout: args.timeout,
        retries: args.retries,
        threads: args.threads,
        allow_missing_tools: args.allow_missing_tools.then_some(true),
        include: (!args.include.is_empty()).then(|| args.include.clone()),
        exclude: (!args.exclude.is_empty()).then(|| args.exclude.clone()),
        per_tool: Default::default(),
        gitlab_url: args.sources.gitlab_url.clone(),
    };

    ScanConfig::try_from(file_layer.overlay(cli_layer))
}

fn print_summary(report: &ScanReport, results_dir: &std::path::Path) {
    let total_tools: usize = report.results.iter().map(|r| r.tool_statuses.len()).sum();
    let failed = report.failed_tool_count();

    println!();
    println!("{}", style("Scan summary").bold());
    println!("  Scan ID:   {}", report.scan_id);
    println!("  Targets:   {}", report.results.len());
    println!("  Tool runs: {}", total_tools);
    if failed == 0 {
        println!("  Failed:    {}", style(0).green());
    } else {
        println!("  Failed:    {}", style(failed).red().bold());
        for result in report.results.iter().filter(|r| !r.all_succeeded()) {
            println!("    {} {}", style(result.target_type).dim(), result.target_id);
            for err in &result.errors {
                println!("      {}", err);
            }
        }
    }
    println!("  Results:   {}", results_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::{Cli, Commands};
    use clap::Parser;
    use std::time::Duration;

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let mut full = vec!["scanwarden", "scan"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Scan(args) => args,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanwarden.yaml");
        tokio::fs::write(&path, "tools: [trivy, syft]\ntimeout: 120\nretries: 2\n").await.unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let args = scan_args(&["--config", &config_arg, "--timeout", "15", "--threads", "2"]);
        let config = build_scan_config(&args).await.unwrap();
        assert_eq!(config.tools, vec!["trivy", "syft"]);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.retries, 2);
        assert_eq!(config.max_workers, Some(2));
    }

    #[tokio::test]
    async fn test_negative_retries_is_config_error() {
        let args = scan_args(&["--retries", "-3"]);
        let err = build_scan_config(&args).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
