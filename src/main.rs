use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scanwarden::cli::{self, Commands, LogFormat};
use scanwarden::config::{self, ScanConfig, ScanSettings};
use scanwarden::errors::WardenError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(!cli.no_color).init(),
    }
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let result = match cli.command {
        Commands::Scan(args) => {
            let show_progress = !args.no_progress && !cli.quiet;
            cli::scan::handle_scan(args, show_progress).await
        }
        Commands::Validate(args) => handle_validate(args).await,
        Commands::Tools => cli::tools::handle_tools(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), WardenError> {
    let file = config::parse_config(&args.config).await?;

    ScanConfig::try_from(ScanSettings::from_config(&file, None)?)?;
    for name in file.profiles.keys() {
        ScanConfig::try_from(ScanSettings::from_config(&file, Some(name))?)
            .map_err(|e| WardenError::Config(format!("profile '{}': {}", name, e)))?;
        info!(profile = %name, "Profile is valid");
    }

    println!(
        "Configuration is valid: {} ({} profile(s))",
        args.config.display(),
        file.profiles.len()
    );
    Ok(())
}
