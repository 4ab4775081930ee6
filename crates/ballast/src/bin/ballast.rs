//! Ballast CLI
//!
//! Loads a service's configuration the same way the service would, and
//! optionally provisions its database.

use std::path::PathBuf;
use std::process::ExitCode;

use ballast::Startup;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ballast")]
#[command(about = "Check service configuration and provision its database", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate configuration, then print the deployment banner
    Check(Source),

    /// Check, then connect to the database and apply pending migrations
    Provision(Source),
}

#[derive(Args)]
struct Source {
    /// Application name (selects /etc/<app>/ and $HOME/.<app>/)
    #[arg(short, long, env = "BALLAST_APP")]
    app: String,

    /// Read this file instead of searching for config.ini
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefix for environment variable overrides
    #[arg(long)]
    env_prefix: Option<String>,

    /// Named HTTP client sections to load
    #[arg(long = "client")]
    clients: Vec<String>,
}

impl Source {
    fn startup(self) -> Startup {
        let mut startup = Startup::new(self.app);
        if let Some(path) = self.config {
            startup = startup.with_config_file(path);
        }
        if let Some(prefix) = self.env_prefix {
            startup = startup.with_env_prefix(prefix);
        }
        for client in self.clients {
            startup = startup.with_http_client(client);
        }
        startup
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(source) => match source.startup().load() {
            Ok(config) => {
                if let Some(deployment) = &config.deployment {
                    print!("{deployment}");
                }
                println!("configuration ok");
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("{err}");
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Provision(source) => {
            let service = source.startup().run_or_exit().await?;
            println!(
                "database {}: {} migration(s) applied",
                service.db.state,
                service.db.applied.len()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
