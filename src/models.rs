use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of page a catalog row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Home,
    Category,
    Vehicle,
    Blog,
    Page,
    Piece,
}

impl PageType {
    pub const ALL: [PageType; 6] = [
        PageType::Home,
        PageType::Category,
        PageType::Vehicle,
        PageType::Blog,
        PageType::Page,
        PageType::Piece,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Home => "home",
            PageType::Category => "category",
            PageType::Vehicle => "vehicle",
            PageType::Blog => "blog",
            PageType::Page => "page",
            PageType::Piece => "piece",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown page type: {}", s))
    }
}

/// Crawl-priority class assigned by the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hot,
    New,
    Stable,
    Cold,
    Exclude,
}

impl Bucket {
    /// Buckets that are streamed into sitemap shards, in generation order.
    pub const STREAMED: [Bucket; 4] = [Bucket::Hot, Bucket::New, Bucket::Stable, Bucket::Cold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Hot => "hot",
            Bucket::New => "new",
            Bucket::Stable => "stable",
            Bucket::Cold => "cold",
            Bucket::Exclude => "exclude",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(Bucket::Hot),
            "new" => Ok(Bucket::New),
            "stable" => Ok(Bucket::Stable),
            "cold" => Ok(Bucket::Cold),
            "exclude" => Ok(Bucket::Exclude),
            other => Err(format!("unknown bucket: {}", other)),
        }
    }
}

/// Non-streamed page types that each get one static sitemap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticKind {
    Homepage,
    Categories,
    Vehicles,
    Blog,
    Pages,
}

impl StaticKind {
    /// Generation order
    pub const ALL: [StaticKind; 5] = [
        StaticKind::Homepage,
        StaticKind::Categories,
        StaticKind::Vehicles,
        StaticKind::Blog,
        StaticKind::Pages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaticKind::Homepage => "homepage",
            StaticKind::Categories => "categories",
            StaticKind::Vehicles => "vehicles",
            StaticKind::Blog => "blog",
            StaticKind::Pages => "pages",
        }
    }

    pub fn page_type(&self) -> PageType {
        match self {
            StaticKind::Homepage => PageType::Home,
            StaticKind::Categories => PageType::Category,
            StaticKind::Vehicles => PageType::Vehicle,
            StaticKind::Blog => PageType::Blog,
            StaticKind::Pages => PageType::Page,
        }
    }
}

impl fmt::Display for StaticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sitemap `<changefreq>` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-page measurements fed into the scoring engine.
///
/// Every field except `cluster_depth` is expected on a 0-100 scale.
/// Callers clamp before scoring; [`SignalBundle::clamped`] does it for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalBundle {
    pub business_value: f64,
    pub demand: f64,
    pub graph_strength: f64,
    /// Number of pages in the cluster this page belongs to
    pub cluster_depth: u32,
    pub content_strength: f64,

    pub duplication_risk: f64,
    pub orphan_risk: f64,
    pub thin_content_risk: f64,
    pub confusion_risk: f64,

    pub meta_robots: Option<String>,
    pub status_code: u16,
    /// URL the page is served at; compared against `canonical_url`
    pub page_url: Option<String>,
    pub canonical_url: Option<String>,
    pub is_recently_published: bool,
}

impl Default for SignalBundle {
    fn default() -> Self {
        Self {
            business_value: 0.0,
            demand: 0.0,
            graph_strength: 0.0,
            cluster_depth: 0,
            content_strength: 0.0,
            duplication_risk: 0.0,
            orphan_risk: 0.0,
            thin_content_risk: 0.0,
            confusion_risk: 0.0,
            meta_robots: None,
            status_code: 200,
            page_url: None,
            canonical_url: None,
            is_recently_published: false,
        }
    }
}

impl SignalBundle {
    /// Copy of the bundle with every 0-100 field clamped into range.
    /// NaN inputs collapse to 0.
    pub fn clamped(&self) -> Self {
        fn c(x: f64) -> f64 {
            if x.is_nan() {
                0.0
            } else {
                x.clamp(0.0, 100.0)
            }
        }
        Self {
            business_value: c(self.business_value),
            demand: c(self.demand),
            graph_strength: c(self.graph_strength),
            cluster_depth: self.cluster_depth,
            content_strength: c(self.content_strength),
            duplication_risk: c(self.duplication_risk),
            orphan_risk: c(self.orphan_risk),
            thin_content_risk: c(self.thin_content_risk),
            confusion_risk: c(self.confusion_risk),
            meta_robots: self.meta_robots.clone(),
            status_code: self.status_code,
            page_url: self.page_url.clone(),
            canonical_url: self.canonical_url.clone(),
            is_recently_published: self.is_recently_published,
        }
    }
}

/// One crawlable URL as read from the catalog store.
/// Identity is the canonical path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCandidate {
    /// Site-relative canonical path, e.g. `/pieces/disque-de-frein-123.html`
    pub path: String,

    pub page_type: PageType,

    /// Last modification time, if the store knows it
    #[serde(default)]
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,

    /// Anchor text used by hub pages
    #[serde(default)]
    pub title: Option<String>,

    /// Match keys linking the page to hub subgroups (family and brand aliases)
    #[serde(default)]
    pub group_keys: Vec<String>,

    /// Stock depth; hubs list deeper inventory first
    #[serde(default)]
    pub inventory: u32,

    #[serde(default)]
    pub signals: SignalBundle,

    /// Per-record sitemap overrides
    #[serde(default)]
    pub changefreq: Option<ChangeFreq>,
    #[serde(default)]
    pub priority: Option<f32>,
}

impl PageCandidate {
    pub fn new(path: impl Into<String>, page_type: PageType) -> Self {
        Self {
            path: path.into(),
            page_type,
            last_modified: None,
            title: None,
            group_keys: Vec::new(),
            inventory: 0,
            signals: SignalBundle::default(),
            changefreq: None,
            priority: None,
        }
    }

    pub fn with_signals(mut self, signals: SignalBundle) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_group_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_inventory(mut self, inventory: u32) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_last_modified(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.last_modified = Some(ts);
        self
    }
}

/// Named contribution to a score, kept for auditability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerm {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub positive: Vec<ScoreTerm>,
    pub negative: Vec<ScoreTerm>,
    pub positive_total: f64,
    pub negative_total: f64,
    /// Confusion risk after blocking rules were applied (100 when blocked)
    pub effective_confusion_risk: f64,
}

/// Output of the scoring engine. Always re-derivable from a [`SignalBundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Raw score on a 0-200 scale
    pub total: f64,
    /// Score on a 0-100 scale
    pub normalized: u8,
    pub bucket: Bucket,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub breakdown: ScoreBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_parse_roundtrip_names() {
        for bucket in [Bucket::Hot, Bucket::New, Bucket::Stable, Bucket::Cold, Bucket::Exclude] {
            assert_eq!(bucket.as_str().parse::<Bucket>().unwrap(), bucket);
        }
        assert!("lukewarm".parse::<Bucket>().is_err());
    }

    #[test]
    fn test_static_kinds_cover_non_streamed_types() {
        let types: Vec<PageType> = StaticKind::ALL.iter().map(|k| k.page_type()).collect();
        for page_type in PageType::ALL {
            assert_eq!(types.contains(&page_type), page_type != PageType::Piece);
        }
    }

    #[test]
    fn test_page_type_parse_is_case_insensitive() {
        assert_eq!("Piece".parse::<PageType>().unwrap(), PageType::Piece);
        assert_eq!(" home ".parse::<PageType>().unwrap(), PageType::Home);
        assert!("article".parse::<PageType>().is_err());
    }

    #[test]
    fn test_clamped_limits_range() {
        let bundle = SignalBundle {
            business_value: 140.0,
            demand: -5.0,
            orphan_risk: f64::NAN,
            cluster_depth: 42,
            ..Default::default()
        };
        let c = bundle.clamped();
        assert_eq!(c.business_value, 100.0);
        assert_eq!(c.demand, 0.0);
        assert_eq!(c.orphan_risk, 0.0);
        assert_eq!(c.cluster_depth, 42);
    }

    #[test]
    fn test_candidate_deserializes_with_defaults() {
        let row: PageCandidate =
            serde_json::from_str(r#"{"path":"/pieces/a.html","page_type":"piece"}"#).unwrap();
        assert_eq!(row.page_type, PageType::Piece);
        assert_eq!(row.signals.status_code, 200);
        assert!(row.group_keys.is_empty());
        assert!(row.last_modified.is_none());
    }

    #[test]
    fn test_signals_use_camel_case() {
        let s: SignalBundle =
            serde_json::from_str(r#"{"businessValue":90,"statusCode":404,"isRecentlyPublished":true}"#)
                .unwrap();
        assert_eq!(s.business_value, 90.0);
        assert_eq!(s.status_code, 404);
        assert!(s.is_recently_published);
    }
}
