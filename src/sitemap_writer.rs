use crate::models::ChangeFreq;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Sitemap URL entry
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
}

/// Writes sitemap `<urlset>` XML
pub struct SitemapWriter<W: Write> {
    writer: W,
    url_count: usize,
}

impl SitemapWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> SitemapWriter<W> {
    pub fn new(mut writer: W) -> std::io::Result<Self> {
        // Write XML header and urlset opening tag
        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(writer, r#"<urlset xmlns="{}">"#, SITEMAP_NS)?;

        Ok(Self {
            writer,
            url_count: 0,
        })
    }

    pub fn add_url(&mut self, url: &SitemapUrl) -> std::io::Result<()> {
        writeln!(self.writer, "  <url>")?;
        writeln!(self.writer, "    <loc>{}</loc>", escape_xml(&url.loc))?;

        if let Some(lastmod) = &url.lastmod {
            writeln!(self.writer, "    <lastmod>{}</lastmod>", escape_xml(lastmod))?;
        }

        if let Some(changefreq) = url.changefreq {
            writeln!(self.writer, "    <changefreq>{}</changefreq>", changefreq)?;
        }

        if let Some(priority) = url.priority {
            writeln!(self.writer, "    <priority>{:.1}</priority>", priority.clamp(0.0, 1.0))?;
        }

        writeln!(self.writer, "  </url>")?;
        self.url_count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> std::io::Result<usize> {
        writeln!(self.writer, "</urlset>")?;
        self.writer.flush()?;
        Ok(self.url_count)
    }
}

/// Entry of a `<sitemapindex>` document
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapRef {
    pub loc: String,
    pub lastmod: Option<String>,
}

/// Writes the root sitemap index
pub struct SitemapIndexWriter<W: Write> {
    writer: W,
    count: usize,
}

impl SitemapIndexWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> SitemapIndexWriter<W> {
    pub fn new(mut writer: W) -> std::io::Result<Self> {
        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(writer, r#"<sitemapindex xmlns="{}">"#, SITEMAP_NS)?;
        Ok(Self { writer, count: 0 })
    }

    pub fn add_sitemap(&mut self, entry: &SitemapRef) -> std::io::Result<()> {
        writeln!(self.writer, "  <sitemap>")?;
        writeln!(self.writer, "    <loc>{}</loc>", escape_xml(&entry.loc))?;
        if let Some(lastmod) = &entry.lastmod {
            writeln!(self.writer, "    <lastmod>{}</lastmod>", escape_xml(lastmod))?;
        }
        writeln!(self.writer, "  </sitemap>")?;
        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> std::io::Result<usize> {
        writeln!(self.writer, "</sitemapindex>")?;
        self.writer.flush()?;
        Ok(self.count)
    }
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_urlset_omits_absent_fields() {
        let temp = NamedTempFile::new().unwrap();
        let mut writer = SitemapWriter::create(temp.path()).unwrap();
        writer.add_url(&SitemapUrl {
            loc: "https://shop.example/pieces/disque-de-frein-avant".to_string(),
            lastmod: Some("2026-10-17".to_string()),
            changefreq: Some(ChangeFreq::Weekly),
            priority: Some(0.6),
        }).unwrap();
        writer.add_url(&SitemapUrl {
            loc: "https://shop.example/search?brand=renault&model=clio".to_string(),
            lastmod: None,
            changefreq: None,
            priority: Some(1.7),
        }).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let content = std::fs::read_to_string(temp.path()).unwrap();
        assert!(content.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert_eq!(content.matches("<url>").count(), 2);
        assert_eq!(content.matches("<lastmod>").count(), 1);
        assert_eq!(content.matches("<changefreq>").count(), 1);
        assert!(content.contains("<changefreq>weekly</changefreq>"));
        assert!(content.contains("<priority>0.6</priority>"));
        // out-of-range priorities are clamped
        assert!(content.contains("<priority>1.0</priority>"));
        assert!(content.contains("brand=renault&amp;model=clio"));
        assert!(content.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_sitemap_index_writer() {
        let mut buf = Vec::new();
        let mut writer = SitemapIndexWriter::new(&mut buf).unwrap();
        writer.add_sitemap(&SitemapRef {
            loc: "https://example.com/sitemap-hot-pieces.xml".to_string(),
            lastmod: Some("2026-10-17".to_string()),
        }).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        let content = String::from_utf8(buf).unwrap();
        assert!(content.contains("<sitemapindex"));
        assert!(content.contains("<loc>https://example.com/sitemap-hot-pieces.xml</loc>"));
        assert!(content.trim_end().ends_with("</sitemapindex>"));
    }
}
