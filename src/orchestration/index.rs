//! Root sitemap index.

use crate::config::Config;
use crate::error::WriteError;
use crate::shard_writer::write_atomically;
use crate::sitemap_writer::{SitemapIndexWriter, SitemapRef};
use crate::url_utils;
use std::path::{Path, PathBuf};
use url::Url;

/// Write `sitemap.xml` listing `sitemaps` in the given order.
pub fn write_sitemap_index(
    output_dir: &Path,
    base_url: &Url,
    sitemaps: &[PathBuf],
    lastmod: chrono::NaiveDate,
) -> Result<PathBuf, WriteError> {
    let path = output_dir.join(Config::SITEMAP_INDEX_FILE);
    let lastmod = lastmod.format("%Y-%m-%d").to_string();

    let mut refs = Vec::with_capacity(sitemaps.len());
    for sitemap in sitemaps {
        let rel = sitemap.strip_prefix(output_dir).unwrap_or(sitemap);
        let rel = rel.to_string_lossy().replace('\\', "/");
        let loc = url_utils::absolute_url(base_url, &rel).map_err(|e| {
            WriteError::new(&path, std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        refs.push(SitemapRef {
            loc,
            lastmod: Some(lastmod.clone()),
        });
    }

    write_atomically(&path, |tmp| {
        let mut writer = SitemapIndexWriter::create(tmp)?;
        for r in &refs {
            writer.add_sitemap(r)?;
        }
        writer.finish()?;
        Ok(())
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_index_lists_sitemaps_in_order() {
        let dir = TempDir::new().unwrap();
        let base = Url::parse("https://www.example.com/").unwrap();
        let files = vec![
            dir.path().join("sitemap-homepage.xml"),
            dir.path().join("sitemap-hot-pieces-1.xml"),
            dir.path().join("sitemap-hot-pieces-2.xml"),
        ];
        let date = chrono::NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let path = write_sitemap_index(dir.path(), &base, &files, date).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let home = content.find("https://www.example.com/sitemap-homepage.xml").unwrap();
        let hot2 = content.find("https://www.example.com/sitemap-hot-pieces-2.xml").unwrap();
        assert!(home < hot2);
        assert_eq!(content.matches("<sitemap>").count(), 3);
        assert!(content.contains("<lastmod>2026-10-17</lastmod>"));
    }
}
