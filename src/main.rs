//! cidrfold - canonical allow/deny CIDR sets for WAF rule engines.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cidrfold::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Update { dry_run } => cidrfold::commands::update::run(dry_run, &cli.config).await,
        Commands::Build {
            allow,
            deny,
            dry_run,
        } => cidrfold::commands::build::run(&allow, &deny, dry_run, &cli.config),
        Commands::Check { target } => cidrfold::commands::check::run(&target, &cli.config),
        Commands::Stats => cidrfold::commands::stats::run(&cli.config),
        Commands::Init { force } => cidrfold::commands::init::run(force, &cli.config),
        Commands::Version => {
            println!("cidrfold {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
