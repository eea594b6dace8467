use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Exit codes: 0=success, 2=invalid arguments, 3=configuration or I/O error,
/// 4=run finished with failed generators
#[derive(Parser, Debug)]
#[command(name = "catalog-sitemap")]
#[command(about = "Scores catalog pages and regenerates sitemaps and crawl hubs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Regenerate every sitemap, hub and index from the catalog store.
    Generate {
        #[arg(short, long, help = "Generator settings (TOML)")]
        config: PathBuf,

        #[arg(short, long, help = "Overrides output_dir from the config file")]
        output_dir: Option<PathBuf>,

        #[arg(short, long, help = "Overrides data_dir (catalog store location)")]
        data_dir: Option<PathBuf>,

        #[arg(short, long, help = "Overrides base_url, e.g. https://www.example.com")]
        base_url: Option<String>,

        #[arg(long, help = "Overrides hubs_file (hub group definitions, TOML)")]
        hubs: Option<PathBuf>,

        #[arg(long, help = "Generation date for <lastmod> fallbacks (YYYY-MM-DD, default today)")]
        date: Option<chrono::NaiveDate>,

        #[arg(long, default_value = "./logs", help = "Directory for rotated log files")]
        log_dir: PathBuf,
    },

    /// Load JSONL catalog rows into the store, scoring each one.
    Import {
        #[arg(short, long, default_value = "./data", help = "Catalog store directory")]
        data_dir: PathBuf,

        #[arg(short, long, help = "Newline-delimited JSON rows")]
        input: PathBuf,
    },

    /// Score one signal bundle (JSON file, or - for stdin) and print the result.
    Score {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate a hub group definition file.
    CheckHubs {
        #[arg(long)]
        hubs: PathBuf,
    },
}
