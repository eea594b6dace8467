//! Hub collection, claiming and pagination.
//!
//! A group is handled in two steps. [`collect_group`] only reads and may run
//! concurrently with other groups. [`write_group`] claims URLs in the shared
//! dedup cache and writes files; the orchestrator calls it in config order.

use super::config::{GroupKind, HubGroupDef};
use super::render::{self, GroupSummary, HubLink, PartContext, PartSummary};
use crate::dedup::DedupCache;
use crate::error::{SourceError, WriteError};
use crate::metrics::SharedMetrics;
use crate::models::PageCandidate;
use crate::scoring;
use crate::shard_writer::{write_atomically, ShardFormat, ShardInfo, ShardNaming, ShardWriter};
use crate::source::{RecordFilter, RecordSource};
use crate::url_utils;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use url::Url;

/// A collected hub member, reduced to what the hub page needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubMember {
    pub path: String,
    pub title: Option<String>,
    pub inventory: u32,
    /// Index into the group's subgroups
    pub subgroup: usize,
}

impl HubMember {
    fn from_candidate(row: PageCandidate, subgroup: usize) -> Self {
        Self {
            path: row.path,
            title: row.title,
            inventory: row.inventory,
            subgroup,
        }
    }
}

/// Everything one group's subgroups matched, before dedup.
#[derive(Debug, Clone)]
pub struct CollectedGroup {
    pub def: HubGroupDef,
    /// Subgroup order, then path order within each match key
    pub members: Vec<HubMember>,
    pub blocked: usize,
}

/// Files produced for one non-empty group
#[derive(Debug, Clone)]
pub struct GroupOutput {
    pub summary: GroupSummary,
    pub files: Vec<PathBuf>,
    pub subgroup_counts: Vec<(String, usize)>,
}

/// Read every row matching the group's subgroups. Blocked rows are dropped;
/// a path matched by several subgroups is kept under the first one.
pub async fn collect_group(
    source: &RecordSource,
    def: &HubGroupDef,
    page_size: usize,
) -> Result<CollectedGroup, SourceError> {
    let mut members = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut blocked = 0;

    for (index, subgroup) in def.subgroups.iter().enumerate() {
        for key in subgroup.match_keys.iter().filter(|k| !k.trim().is_empty()) {
            let mut cursor = source.cursor(RecordFilter::default().group_key(key.trim()), page_size);
            while let Some(batch) = cursor.next_batch().await? {
                for row in batch {
                    if scoring::score_candidate(&row).is_blocked {
                        blocked += 1;
                        continue;
                    }
                    if seen.insert(url_utils::dedup_key(&row.path)) {
                        members.push(HubMember::from_candidate(row, index));
                    }
                }
            }
        }
    }

    tracing::debug!(
        group = %def.step_name(),
        members = members.len(),
        blocked,
        "collected hub group"
    );

    Ok(CollectedGroup {
        def: def.clone(),
        members,
        blocked,
    })
}

/// Where and how a group is written
#[derive(Clone)]
pub struct HubWriteOptions<'a> {
    pub base_url: &'a Url,
    pub output_dir: &'a Path,
    pub part_size: usize,
    pub metrics: Option<SharedMetrics>,
}

/// Claim, sort and paginate a collected group. Returns `None` when nothing
/// survives dedup; no file is written for such a group.
pub fn write_group(
    collected: CollectedGroup,
    dedup: &DedupCache,
    opts: &HubWriteOptions<'_>,
) -> Result<Option<GroupOutput>, WriteError> {
    let def = collected.def;
    let mut counts = vec![0usize; def.subgroups.len()];
    let mut kept = Vec::with_capacity(collected.members.len());
    let mut duplicates = 0u64;

    for member in collected.members {
        if dedup.claim(&member.path) {
            counts[member.subgroup] += 1;
            kept.push(member);
        } else {
            duplicates += 1;
        }
    }
    if let Some(metrics) = &opts.metrics {
        metrics.duplicates_skipped.add(duplicates);
        metrics.blocked_skipped.add(collected.blocked as u64);
    }

    if kept.is_empty() {
        tracing::info!(group = %def.step_name(), "hub group empty after dedup, omitted");
        return Ok(None);
    }

    kept.sort_by(|a, b| b.inventory.cmp(&a.inventory).then_with(|| a.path.cmp(&b.path)));

    let part_size = opts.part_size.max(1);
    let total_urls = kept.len();
    let total_parts = total_urls.div_ceil(part_size);
    let naming = ShardNaming::hub_parts();
    let group_dir = opts.output_dir.join(def.kind.dir_name()).join(&def.key);

    let format = HubPartFormat {
        kind: def.kind,
        key: def.key.clone(),
        label: def.label.clone(),
        total_urls,
        total_parts,
        naming: naming.clone(),
    };
    let mut writer = ShardWriter::new(&group_dir, naming, part_size, format);
    if let Some(metrics) = &opts.metrics {
        writer = writer.with_metrics(metrics.clone());
    }

    for member in kept {
        let url = match url_utils::absolute_url(opts.base_url, &member.path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path = %member.path, error = %e, "unjoinable hub path, kept relative");
                member.path.clone()
            }
        };
        writer.append(HubLink {
            title: member.title.unwrap_or_else(|| member.path.clone()),
            path: member.path,
            url,
            inventory: member.inventory,
        })?;
    }
    let shards = writer.flush_remaining()?;

    let parts: Vec<PartSummary> = shards
        .shards
        .iter()
        .scan(0usize, |offset, shard| {
            let first = *offset + 1;
            *offset += shard.entries;
            Some(PartSummary {
                file_name: shard
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                first,
                last: *offset,
            })
        })
        .collect();

    let subgroup_counts: Vec<(String, usize)> = def
        .subgroups
        .iter()
        .zip(counts)
        .map(|(sub, count)| (sub.label.clone(), count))
        .collect();

    let index_path = group_dir.join("index.html");
    write_atomically(&index_path, |tmp| {
        let mut out = BufWriter::new(File::create(tmp)?);
        render::render_group_index(
            &mut out,
            def.kind,
            &def.key,
            &def.label,
            total_urls,
            &parts,
            &subgroup_counts,
        )?;
        std::io::Write::flush(&mut out)
    })?;

    let mut files: Vec<PathBuf> = shards.paths().map(Path::to_path_buf).collect();
    files.push(index_path);

    tracing::info!(
        group = %def.step_name(),
        urls = total_urls,
        parts = parts.len(),
        "hub group written"
    );

    Ok(Some(GroupOutput {
        summary: GroupSummary {
            kind: def.kind,
            key: def.key.clone(),
            label: def.label.clone(),
            url_count: total_urls,
            part_count: parts.len(),
            index_path: format!("{}/index.html", def.rel_dir()),
        },
        files,
        subgroup_counts,
    }))
}

/// Write the root hub `index.html` listing every non-empty group.
pub fn write_global_index(output_dir: &Path, groups: &[GroupSummary]) -> Result<PathBuf, WriteError> {
    let path = output_dir.join("index.html");
    write_atomically(&path, |tmp| {
        let mut out = BufWriter::new(File::create(tmp)?);
        render::render_global_index(&mut out, groups)?;
        std::io::Write::flush(&mut out)
    })?;
    Ok(path)
}

/// Renders one hub part per shard.
struct HubPartFormat {
    kind: GroupKind,
    key: String,
    label: String,
    total_urls: usize,
    total_parts: usize,
    naming: ShardNaming,
}

impl ShardFormat for HubPartFormat {
    type Entry = HubLink;

    fn write_shard(&self, path: &Path, entries: &[HubLink], info: ShardInfo) -> std::io::Result<()> {
        let ctx = PartContext {
            kind: self.kind,
            key: &self.key,
            label: &self.label,
            part: info.index,
            total_parts: self.total_parts,
            total_urls: self.total_urls,
            offset: info.offset,
            prev: (info.index > 1).then(|| self.naming.file_name(info.index - 1, false)),
            next: (info.index < self.total_parts).then(|| self.naming.file_name(info.index + 1, false)),
        };
        let mut out = BufWriter::new(File::create(path)?);
        render::render_part(&mut out, &ctx, entries)?;
        std::io::Write::flush(&mut out)
    }
}
