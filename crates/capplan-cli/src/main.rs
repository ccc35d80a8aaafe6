//! Capplan CLI - quarterly capacity planning
//!
//! Plan team effort across sprints, freeze baselines, and compare the live
//! plan against them.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{Cli, Commands};

/// Initialize tracing with optional file logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_file: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        "capplan=debug,capplan_core=debug,capplan_web=debug"
    } else {
        "capplan=info,capplan_core=info,capplan_web=debug"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if let Some(path) = log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let _ = std::fs::create_dir_all(dir);
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "serve.log".into());

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        // Log to both stdout and file when --log is used
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Serve(args) if args.log => Some(
            args.log_file
                .clone()
                .unwrap_or_else(|| "capplan-serve.log".into()),
        ),
        _ => None,
    };

    let _guard = init_tracing(log_file.as_deref(), cli.verbose);

    cli.execute().await
}
