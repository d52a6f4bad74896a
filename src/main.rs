use anyhow::Context;
use clap::Parser;
use regime_gate::cli::{Cli, Commands};
use regime_gate::config::Config;
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../config.toml.example");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing file falls back to the bundled example; an invalid one is fatal
    let using_example = !Path::new(&cli.config).exists();
    let config = if using_example {
        Config::from_toml(EXAMPLE_CONFIG).context("Bundled example config is invalid")?
    } else {
        Config::load(&cli.config)
            .with_context(|| format!("Invalid configuration in {}", cli.config))?
    };

    // Initialize telemetry
    regime_gate::telemetry::init_telemetry(&config.telemetry)?;
    if using_example {
        tracing::warn!(path = %cli.config, "Config file not found; using bundled example");
    }

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting scanner and paper executor");
            args.execute(&config).await?;
        }
        Commands::Scan(args) => {
            tracing::info!("Starting regime scanner");
            args.execute(&config).await?;
        }
        Commands::Paper(args) => {
            tracing::info!("Starting paper executor");
            args.execute(&config).await?;
        }
        Commands::Status(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Effective configuration ({}):", cli.config);
            println!("{:#?}", config);
        }
    }

    Ok(())
}
