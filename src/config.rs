// Global configuration constants - single source of truth

use crate::error::ConfigError;
use crate::models::{Bucket, ChangeFreq, StaticKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

pub struct Config;

impl Config {
    // Shard bounds
    pub const SITEMAP_SHARD_SIZE: usize = 50_000;
    pub const HUB_PART_SIZE: usize = 5_000;

    // Store access
    pub const STORE_MAX_ROWS_PER_REQUEST: usize = 1_000;
    pub const FETCH_PAGE_SIZE: usize = 1_000;
    pub const MAX_CONCURRENT_FETCHES: usize = 4;

    // Output layout
    pub const SITEMAP_INDEX_FILE: &'static str = "sitemap.xml";
    pub const HUB_INDEX_FILE: &'static str = "index.html";
    pub const AUDIT_DIR: &'static str = "audit";
}

/// `<changefreq>` and `<priority>` applied to entries that carry no override
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryDefaults {
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

impl EntryDefaults {
    const fn new(changefreq: ChangeFreq, priority: f32) -> Self {
        Self { changefreq, priority }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    pub sitemap_shard_size: usize,
    pub hub_part_size: usize,
    pub fetch_page_size: usize,
    pub max_concurrent_fetches: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            sitemap_shard_size: Config::SITEMAP_SHARD_SIZE,
            hub_part_size: Config::HUB_PART_SIZE,
            fetch_page_size: Config::FETCH_PAGE_SIZE,
            max_concurrent_fetches: Config::MAX_CONCURRENT_FETCHES,
        }
    }
}

fn default_buckets() -> BTreeMap<Bucket, EntryDefaults> {
    BTreeMap::from([
        (Bucket::Hot, EntryDefaults::new(ChangeFreq::Daily, 1.0)),
        (Bucket::New, EntryDefaults::new(ChangeFreq::Daily, 0.8)),
        (Bucket::Stable, EntryDefaults::new(ChangeFreq::Weekly, 0.6)),
        (Bucket::Cold, EntryDefaults::new(ChangeFreq::Monthly, 0.4)),
    ])
}

fn default_static_pages() -> BTreeMap<StaticKind, EntryDefaults> {
    BTreeMap::from([
        (StaticKind::Homepage, EntryDefaults::new(ChangeFreq::Daily, 1.0)),
        (StaticKind::Categories, EntryDefaults::new(ChangeFreq::Weekly, 0.8)),
        (StaticKind::Vehicles, EntryDefaults::new(ChangeFreq::Weekly, 0.7)),
        (StaticKind::Blog, EntryDefaults::new(ChangeFreq::Weekly, 0.5)),
        (StaticKind::Pages, EntryDefaults::new(ChangeFreq::Monthly, 0.3)),
    ])
}

/// Generator settings, read from TOML.
///
/// ```toml
/// base_url = "https://www.example.com"
/// output_dir = "public"
/// data_dir = "data"
/// hubs_file = "hubs.toml"
///
/// [limits]
/// sitemap_shard_size = 50000
///
/// [buckets.hot]
/// changefreq = "daily"
/// priority = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub hubs_file: Option<PathBuf>,
    #[serde(default)]
    pub limits: Limits,
    /// Entries present in the file replace the built-in value for that bucket only
    #[serde(default)]
    pub buckets: BTreeMap<Bucket, EntryDefaults>,
    #[serde(default)]
    pub static_pages: BTreeMap<StaticKind, EntryDefaults>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            output_dir: None,
            data_dir: None,
            hubs_file: None,
            limits: Limits::default(),
            buckets: BTreeMap::new(),
            static_pages: BTreeMap::new(),
        }
    }
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub hubs_file: Option<PathBuf>,
}

/// Validated settings used by a run
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub hubs_file: Option<PathBuf>,
    pub limits: Limits,
    pub buckets: BTreeMap<Bucket, EntryDefaults>,
    pub static_pages: BTreeMap<StaticKind, EntryDefaults>,
}

impl ResolvedConfig {
    /// Defaults for a streamed bucket. `Exclude` is never streamed.
    pub fn bucket_defaults(&self, bucket: Bucket) -> Option<EntryDefaults> {
        self.buckets.get(&bucket).copied()
    }

    pub fn static_defaults(&self, kind: StaticKind) -> Option<EntryDefaults> {
        self.static_pages.get(&kind).copied()
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.base_url.is_some() {
            self.base_url = overrides.base_url;
        }
        if overrides.output_dir.is_some() {
            self.output_dir = overrides.output_dir;
        }
        if overrides.data_dir.is_some() {
            self.data_dir = overrides.data_dir;
        }
        if overrides.hubs_file.is_some() {
            self.hubs_file = overrides.hubs_file;
        }
        self
    }

    /// Check every setting and merge built-in defaults.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let raw_base = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("base_url"))?;
        let base_url = Url::parse(raw_base.trim()).map_err(|e| ConfigError::Invalid {
            field: "base_url",
            message: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field: "base_url",
                message: format!("{} is not an absolute http(s) URL", raw_base),
            });
        }

        let output_dir = self
            .output_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("output_dir"))?;

        let limits = self.limits;
        for (field, value) in [
            ("limits.sitemap_shard_size", limits.sitemap_shard_size),
            ("limits.hub_part_size", limits.hub_part_size),
            ("limits.fetch_page_size", limits.fetch_page_size),
            ("limits.max_concurrent_fetches", limits.max_concurrent_fetches),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if limits.sitemap_shard_size > Config::SITEMAP_SHARD_SIZE {
            return Err(ConfigError::Invalid {
                field: "limits.sitemap_shard_size",
                message: format!("sitemaps hold at most {} URLs", Config::SITEMAP_SHARD_SIZE),
            });
        }

        if self.buckets.contains_key(&Bucket::Exclude) {
            return Err(ConfigError::Invalid {
                field: "buckets",
                message: "the exclude bucket is never written".to_string(),
            });
        }
        let mut buckets = default_buckets();
        buckets.extend(self.buckets);
        let mut static_pages = default_static_pages();
        static_pages.extend(self.static_pages);

        for defaults in buckets.values().chain(static_pages.values()) {
            if !(0.0..=1.0).contains(&defaults.priority) {
                return Err(ConfigError::Invalid {
                    field: "priority",
                    message: format!("{} is outside 0.0..=1.0", defaults.priority),
                });
            }
        }

        Ok(ResolvedConfig {
            base_url,
            output_dir,
            data_dir: self.data_dir,
            hubs_file: self.hubs_file,
            limits,
            buckets,
            static_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<GeneratorConfig, ConfigError> {
        GeneratorConfig::parse(s, Path::new("generator.toml"))
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(
            r#"
base_url = "https://www.example.com"
output_dir = "public"
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();

        assert_eq!(config.limits.sitemap_shard_size, 50_000);
        assert_eq!(config.limits.hub_part_size, 5_000);
        let hot = config.bucket_defaults(Bucket::Hot).unwrap();
        assert_eq!(hot.changefreq, ChangeFreq::Daily);
        assert_eq!(hot.priority, 1.0);
        let cold = config.bucket_defaults(Bucket::Cold).unwrap();
        assert_eq!(cold.changefreq, ChangeFreq::Monthly);
        assert!(config.bucket_defaults(Bucket::Exclude).is_none());
        assert!(config.static_defaults(StaticKind::Homepage).is_some());
    }

    #[test]
    fn test_file_overrides_single_bucket() {
        let config = parse(
            r#"
base_url = "https://www.example.com"
output_dir = "public"

[buckets.stable]
changefreq = "daily"
priority = 0.7
"#,
        )
        .unwrap()
        .resolve()
        .unwrap();
        let stable = config.bucket_defaults(Bucket::Stable).unwrap();
        assert_eq!(stable.changefreq, ChangeFreq::Daily);
        assert_eq!(stable.priority, 0.7);
        assert_eq!(config.bucket_defaults(Bucket::New).unwrap().priority, 0.8);
    }

    #[test]
    fn test_missing_output_dir_is_config_error() {
        let err = parse(r#"base_url = "https://www.example.com""#)
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("output_dir")));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = parse(
            r#"
base_url = "https://old.example.com"
output_dir = "old"
"#,
        )
        .unwrap()
        .apply(ConfigOverrides {
            base_url: Some("https://new.example.com".to_string()),
            output_dir: Some(PathBuf::from("new")),
            ..Default::default()
        })
        .resolve()
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://new.example.com/");
        assert_eq!(config.output_dir, PathBuf::from("new"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = "base_url = \"https://www.example.com\"\noutput_dir = \"out\"\n";

        let err = parse(&format!("{}[limits]\nhub_part_size = 0\n", base))
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("hub_part_size"));

        let err = parse(&format!("{}[limits]\nsitemap_shard_size = 60000\n", base))
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("sitemap_shard_size"));

        let err = parse("base_url = \"ftp://x\"\noutput_dir = \"out\"\n")
            .unwrap()
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));

        assert!(parse(&format!("{}unknown = 1\n", base)).is_err());
    }
}
