use catalog_sitemap::cli::{Cli, Commands};
use catalog_sitemap::config::{ConfigOverrides, GeneratorConfig};
use catalog_sitemap::error::ConfigError;
use catalog_sitemap::hub::HubConfig;
use catalog_sitemap::logging;
use catalog_sitemap::models::SignalBundle;
use catalog_sitemap::orchestration::{setup_shutdown_handler, Orchestrator, RunFailure, StopSignal};
use catalog_sitemap::scoring::{self, PlaceholderEstimator};
use catalog_sitemap::store::{CatalogStore, StoreError};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Run(#[from] RunFailure),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("{count} generator(s) failed: {names}")]
    Partial { count: usize, names: String },

    #[error("run interrupted before completion")]
    Interrupted,
}

impl MainError {
    fn exit_code(&self) -> u8 {
        match self {
            MainError::Partial { .. } | MainError::Interrupted => 4,
            _ => 3,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), MainError> {
    match cli.command {
        Commands::Generate {
            config,
            output_dir,
            data_dir,
            base_url,
            hubs,
            date,
            log_dir,
        } => {
            let _guards = logging::init_logging(&log_dir).map_err(|e| MainError::Logging(e.to_string()))?;

            let resolved = GeneratorConfig::load(&config)?
                .apply(ConfigOverrides {
                    base_url,
                    output_dir,
                    data_dir,
                    hubs_file: hubs,
                })
                .resolve()?;

            let data_dir = resolved.data_dir.clone().ok_or(ConfigError::Missing("data_dir"))?;
            let hub_config = match &resolved.hubs_file {
                Some(path) => HubConfig::load(path)?,
                None => HubConfig::default(),
            };
            let store = CatalogStore::open(&data_dir)?;

            let stop = StopSignal::new();
            setup_shutdown_handler(stop.clone());

            let mut orchestrator = Orchestrator::new(resolved, hub_config, Arc::new(store)).with_stop_signal(stop);
            if let Some(date) = date {
                orchestrator = orchestrator.with_generation_date(date);
            }

            let report = orchestrator.run().await?;
            println!(
                "Run {}: {} URLs in {} files, phase {}",
                report.run_id,
                report.total_urls(),
                report.files.len(),
                report.phase
            );

            let failed: Vec<&str> = report.failed_steps().map(|s| s.name.as_str()).collect();
            if !failed.is_empty() {
                for step in report.failed_steps() {
                    eprintln!("  {} failed: {}", step.name, step.error.as_deref().unwrap_or("unknown error"));
                }
                return Err(MainError::Partial {
                    count: failed.len(),
                    names: failed.join(", "),
                });
            }
            if report.interrupted {
                return Err(MainError::Interrupted);
            }
        }

        Commands::Import { data_dir, input } => {
            logging::init_stderr_logging();
            let store = CatalogStore::open(&data_dir)?;
            let summary = store.import_jsonl(&input, &PlaceholderEstimator)?;
            println!("Imported {} rows ({} rejected)", summary.imported, summary.rejected.len());
            for (bucket, count) in &summary.by_bucket {
                println!("  {:<8} {}", bucket, count);
            }
        }

        Commands::Score { input } => {
            logging::init_stderr_logging();
            let bundle: SignalBundle = serde_json::from_str(&read_input(&input)?)?;
            let result = scoring::score(&bundle);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::CheckHubs { hubs } => {
            logging::init_stderr_logging();
            let config = HubConfig::load(&hubs)?;
            println!(
                "{}: version {}, {} families, {} brands",
                hubs.display(),
                config.version,
                config.families().count(),
                config.brands().count()
            );
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String, std::io::Error> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}
