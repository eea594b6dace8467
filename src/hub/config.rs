//! Hub group definitions, loaded from a versioned TOML file.
//!
//! New families or brands are added by editing the file; nothing in the
//! generator branches on a specific group.

use crate::error::ConfigError;
use crate::url_utils;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Thematic product family
    Family,
    Brand,
}

impl GroupKind {
    /// Output directory under the site root
    pub fn dir_name(&self) -> &'static str {
        match self {
            GroupKind::Family => "clusters",
            GroupKind::Brand => "constructeurs",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Family => "family",
            GroupKind::Brand => "brand",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubgroupDef {
    pub label: String,
    /// Store group keys whose rows belong to this subgroup
    pub match_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubGroupDef {
    pub kind: GroupKind,
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub subgroups: Vec<SubgroupDef>,
}

impl HubGroupDef {
    /// Site-relative directory, e.g. `clusters/freinage`
    pub fn rel_dir(&self) -> String {
        format!("{}/{}", self.kind.dir_name(), self.key)
    }

    /// Name used in logs, reports and audit records
    pub fn step_name(&self) -> String {
        format!("hub:{}:{}", self.kind.as_str(), self.key)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HubConfigFile {
    version: u32,
    #[serde(default)]
    groups: Vec<HubGroupDef>,
}

/// Validated hub configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubConfig {
    pub version: u32,
    pub groups: Vec<HubGroupDef>,
}

impl HubConfig {
    pub fn new(groups: Vec<HubGroupDef>) -> Result<Self, ConfigError> {
        let config = Self {
            version: SUPPORTED_VERSION,
            groups,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: HubConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        if file.version != SUPPORTED_VERSION {
            return Err(ConfigError::Invalid {
                field: "version",
                message: format!(
                    "hub config version {} is not supported (expected {})",
                    file.version, SUPPORTED_VERSION
                ),
            });
        }

        let config = Self {
            version: file.version,
            groups: file.groups,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashSet<(GroupKind, &str)> = HashSet::new();

        for group in &self.groups {
            let fail = |message: String| ConfigError::Group {
                group: format!("{}:{}", group.kind.as_str(), group.key),
                message,
            };

            if !url_utils::is_valid_slug(&group.key) {
                return Err(fail("key must match [a-z0-9-]+".to_string()));
            }
            if !seen.insert((group.kind, group.key.as_str())) {
                return Err(fail("duplicate key".to_string()));
            }
            if group.label.trim().is_empty() {
                return Err(fail("empty label".to_string()));
            }
            if group.subgroups.is_empty() {
                return Err(fail("no subgroups".to_string()));
            }
            for (i, sub) in group.subgroups.iter().enumerate() {
                if sub.label.trim().is_empty() {
                    return Err(fail(format!("subgroup #{} has an empty label", i + 1)));
                }
                if sub.match_keys.iter().all(|k| k.trim().is_empty()) {
                    return Err(fail(format!("subgroup \"{}\" has no match keys", sub.label)));
                }
            }
        }
        Ok(())
    }

    pub fn families(&self) -> impl Iterator<Item = &HubGroupDef> {
        self.groups.iter().filter(|g| g.kind == GroupKind::Family)
    }

    pub fn brands(&self) -> impl Iterator<Item = &HubGroupDef> {
        self.groups.iter().filter(|g| g.kind == GroupKind::Brand)
    }
}
