//! Web server command.

use anyhow::Result;
use capplan_core::RecordStore;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value = "3030")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (defaults to ./capplan-serve.log)
    #[arg(long, requires = "log")]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, store: Arc<dyn RecordStore>) -> Result<()> {
    println!();
    println!("  {} {}", "Capplan".cyan().bold(), "API Server".bold());
    println!();
    println!(
        "  {}       http://{}:{}/api",
        "API".green(),
        args.host,
        args.port
    );
    println!(
        "  {}    http://{}:{}/health",
        "Health".green(),
        args.host,
        args.port
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    capplan_web::run_server(store, &args.host, args.port).await?;

    Ok(())
}
