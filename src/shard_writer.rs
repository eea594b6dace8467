//! Bounded shard writer.
//!
//! Entries are buffered until the buffer holds `shard_size` of them; the
//! buffer is then written as one complete file, cleared, and the writer moves
//! on to the next shard. Peak memory is one shard regardless of stream size.

use crate::error::WriteError;
use crate::metrics::SharedMetrics;
use crate::sitemap_writer::{SitemapUrl, SitemapWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Position of a shard within its stream, handed to the format on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardInfo {
    /// 1-based shard number
    pub index: usize,
    /// Entries before this shard in the stream
    pub offset: usize,
}

/// How a stream's entries become bytes on disk.
pub trait ShardFormat {
    type Entry;

    fn write_shard(&self, path: &Path, entries: &[Self::Entry], info: ShardInfo) -> std::io::Result<()>;
}

/// File naming policy for a stream of shards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardNaming {
    /// `<stem>.<ext>` when the whole stream lands in the trailing flush,
    /// otherwise `<stem>-1.<ext>`, `<stem>-2.<ext>`, ...
    Stem { stem: String, extension: String },
    /// `<prefix><NNN>.<ext>` for every shard, zero-padded to `width`
    Numbered {
        prefix: String,
        width: usize,
        extension: String,
    },
}

impl ShardNaming {
    pub fn sitemap(stem: impl Into<String>) -> Self {
        ShardNaming::Stem {
            stem: stem.into(),
            extension: "xml".to_string(),
        }
    }

    pub fn hub_parts() -> Self {
        ShardNaming::Numbered {
            prefix: "part-".to_string(),
            width: 3,
            extension: "html".to_string(),
        }
    }

    /// File name for shard `index`; `single` marks a stream that fits one shard.
    pub fn file_name(&self, index: usize, single: bool) -> String {
        match self {
            ShardNaming::Stem { stem, extension } if single => format!("{}.{}", stem, extension),
            ShardNaming::Stem { stem, extension } => format!("{}-{}.{}", stem, index, extension),
            ShardNaming::Numbered {
                prefix,
                width,
                extension,
            } => format!("{}{:0width$}.{}", prefix, index, extension, width = *width),
        }
    }
}

/// One sealed shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenShard {
    pub path: PathBuf,
    pub entries: usize,
}

/// Result of a finished stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardSummary {
    pub shards: Vec<WrittenShard>,
    pub total_entries: usize,
}

impl ShardSummary {
    pub fn last_path(&self) -> Option<&Path> {
        self.shards.last().map(|s| s.path.as_path())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.shards.iter().map(|s| s.path.as_path())
    }
}

pub struct ShardWriter<F: ShardFormat> {
    dir: PathBuf,
    naming: ShardNaming,
    shard_size: usize,
    format: F,
    buffer: Vec<F::Entry>,
    written: Vec<WrittenShard>,
    total: usize,
    metrics: Option<SharedMetrics>,
}

impl<F: ShardFormat> ShardWriter<F> {
    pub fn new(dir: impl Into<PathBuf>, naming: ShardNaming, shard_size: usize, format: F) -> Self {
        let shard_size = shard_size.max(1);
        Self {
            dir: dir.into(),
            naming,
            shard_size,
            format,
            buffer: Vec::with_capacity(shard_size.min(65_536)),
            written: Vec::new(),
            total: 0,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn shards_written(&self) -> usize {
        self.written.len()
    }

    /// Buffer one entry, sealing a shard as soon as the buffer is full.
    pub fn append(&mut self, entry: F::Entry) -> Result<(), WriteError> {
        self.buffer.push(entry);
        if self.buffer.len() >= self.shard_size {
            self.seal(false)?;
        }
        Ok(())
    }

    /// Seal the trailing partial shard and finish the stream. An empty buffer
    /// writes nothing.
    pub fn flush_remaining(mut self) -> Result<ShardSummary, WriteError> {
        if !self.buffer.is_empty() {
            let single = self.written.is_empty();
            self.seal(single)?;
        }
        Ok(ShardSummary {
            shards: self.written,
            total_entries: self.total,
        })
    }

    fn seal(&mut self, single: bool) -> Result<(), WriteError> {
        let index = self.written.len() + 1;
        let path = self.dir.join(self.naming.file_name(index, single));
        let info = ShardInfo {
            index,
            offset: self.total,
        };

        let started = Instant::now();
        write_atomically(&path, |tmp| self.format.write_shard(tmp, &self.buffer, info))?;

        let entries = self.buffer.len();
        if let Some(metrics) = &self.metrics {
            metrics.record_flush(entries, started.elapsed());
        }
        tracing::debug!(path = %path.display(), entries, "sealed shard");

        self.total += entries;
        self.written.push(WrittenShard { path, entries });
        self.buffer.clear();
        Ok(())
    }
}

/// Write through a temporary sibling and rename, so a failed write never
/// leaves a truncated file under the final name.
pub fn write_atomically<G>(path: &Path, write: G) -> Result<(), WriteError>
where
    G: FnOnce(&Path) -> std::io::Result<()>,
{
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WriteError::new(parent, e))?;
    }

    if let Err(e) = write(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(WriteError::new(path, e));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        WriteError::new(path, e)
    })
}

/// Sitemap `<urlset>` shards
#[derive(Debug, Clone, Copy, Default)]
pub struct SitemapShardFormat;

impl ShardFormat for SitemapShardFormat {
    type Entry = SitemapUrl;

    fn write_shard(&self, path: &Path, entries: &[SitemapUrl], _info: ShardInfo) -> std::io::Result<()> {
        let mut writer = SitemapWriter::create(path)?;
        for entry in entries {
            writer.add_url(entry)?;
        }
        writer.finish()?;
        Ok(())
    }
}
