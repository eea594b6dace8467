//! HTML for hub parts, group indexes and the global hub index.
//!
//! Hubs exist to hand crawlers internal links, so every page is marked
//! `noindex, follow` and kept deliberately plain.

use super::config::GroupKind;
use crate::sitemap_writer::escape_xml as escape;
use std::fmt::Write as _;
use std::io::Write;

/// One link on a hub part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubLink {
    pub path: String,
    pub url: String,
    pub title: String,
    pub inventory: u32,
}

/// Context shared by every part of one group
#[derive(Debug, Clone)]
pub struct PartContext<'a> {
    pub kind: GroupKind,
    pub key: &'a str,
    pub label: &'a str,
    pub part: usize,
    pub total_parts: usize,
    pub total_urls: usize,
    /// Entries before this part
    pub offset: usize,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// One part listed on a group index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    pub file_name: String,
    pub first: usize,
    pub last: usize,
}

/// One hub group listed on the global index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub kind: GroupKind,
    pub key: String,
    pub label: String,
    pub url_count: usize,
    pub part_count: usize,
    /// Site-relative path of the group index
    pub index_path: String,
}

fn head(out: &mut String, title: &str, extra: &str) {
    out.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(title));
    out.push_str("<meta name=\"robots\" content=\"noindex, follow\">\n");
    out.push_str(extra);
    out.push_str("</head>\n<body>\n");
}

fn tail(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

pub fn render_part<W: Write>(w: &mut W, ctx: &PartContext<'_>, links: &[HubLink]) -> std::io::Result<()> {
    let mut out = String::with_capacity(128 + links.len() * 160);

    let mut extra = String::new();
    if let Some(prev) = &ctx.prev {
        let _ = writeln!(extra, "<link rel=\"prev\" href=\"{}\">", escape(prev));
    }
    if let Some(next) = &ctx.next {
        let _ = writeln!(extra, "<link rel=\"next\" href=\"{}\">", escape(next));
    }
    head(
        &mut out,
        &format!("{} - part {}/{}", ctx.label, ctx.part, ctx.total_parts),
        &extra,
    );

    let _ = writeln!(out, "<h1>{}</h1>", escape(ctx.label));
    let _ = writeln!(
        out,
        "<p class=\"hub-meta\" data-kind=\"{}\" data-group=\"{}\" data-part=\"{}\" data-parts=\"{}\" data-total=\"{}\">Part {} of {}, {} URLs in total</p>",
        ctx.kind.as_str(),
        escape(ctx.key),
        ctx.part,
        ctx.total_parts,
        ctx.total_urls,
        ctx.part,
        ctx.total_parts,
        ctx.total_urls
    );

    nav(&mut out, ctx);
    let _ = writeln!(out, "<ol start=\"{}\">", ctx.offset + 1);
    for link in links {
        let _ = writeln!(
            out,
            "<li><a href=\"{}\">{}</a></li>",
            escape(&link.url),
            escape(&link.title)
        );
    }
    out.push_str("</ol>\n");
    nav(&mut out, ctx);
    tail(&mut out);

    w.write_all(out.as_bytes())
}

fn nav(out: &mut String, ctx: &PartContext<'_>) {
    out.push_str("<nav>");
    if let Some(prev) = &ctx.prev {
        let _ = write!(out, "<a rel=\"prev\" href=\"{}\">Previous</a> ", escape(prev));
    }
    out.push_str("<a href=\"index.html\">Index</a>");
    if let Some(next) = &ctx.next {
        let _ = write!(out, " <a rel=\"next\" href=\"{}\">Next</a>", escape(next));
    }
    out.push_str("</nav>\n");
}

pub fn render_group_index<W: Write>(
    w: &mut W,
    kind: GroupKind,
    key: &str,
    label: &str,
    total_urls: usize,
    parts: &[PartSummary],
    subgroups: &[(String, usize)],
) -> std::io::Result<()> {
    let mut out = String::new();
    head(&mut out, label, "");

    let _ = writeln!(out, "<h1>{}</h1>", escape(label));
    let _ = writeln!(
        out,
        "<p class=\"hub-meta\" data-kind=\"{}\" data-group=\"{}\" data-parts=\"{}\" data-total=\"{}\">{} URLs in {} parts</p>",
        kind.as_str(),
        escape(key),
        parts.len(),
        total_urls,
        total_urls,
        parts.len()
    );

    out.push_str("<ul class=\"hub-parts\">\n");
    for part in parts {
        let _ = writeln!(
            out,
            "<li><a href=\"{}\">URLs {} to {}</a></li>",
            escape(&part.file_name),
            part.first,
            part.last
        );
    }
    out.push_str("</ul>\n");

    out.push_str("<table class=\"hub-subgroups\">\n<tr><th>Subgroup</th><th>URLs</th></tr>\n");
    for (label, count) in subgroups {
        let _ = writeln!(out, "<tr><td>{}</td><td>{}</td></tr>", escape(label), count);
    }
    out.push_str("</table>\n");

    out.push_str("<nav><a href=\"../../index.html\">All hubs</a></nav>\n");
    tail(&mut out);
    w.write_all(out.as_bytes())
}

pub fn render_global_index<W: Write>(w: &mut W, groups: &[GroupSummary]) -> std::io::Result<()> {
    let mut out = String::new();
    head(&mut out, "Hubs", "");
    out.push_str("<h1>Hubs</h1>\n");

    for (kind, heading) in [(GroupKind::Family, "Families"), (GroupKind::Brand, "Brands")] {
        let mut listed = groups.iter().filter(|g| g.kind == kind).peekable();
        if listed.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "<h2>{}</h2>\n<ul class=\"hub-groups\" data-kind=\"{}\">", heading, kind.as_str());
        for group in listed {
            let _ = writeln!(
                out,
                "<li><a href=\"{}\">{}</a> ({} URLs, {} parts)</li>",
                escape(&group.index_path),
                escape(&group.label),
                group.url_count,
                group.part_count
            );
        }
        out.push_str("</ul>\n");
    }

    tail(&mut out);
    w.write_all(out.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(i: usize) -> HubLink {
        HubLink {
            path: format!("/pieces/{}.html", i),
            url: format!("https://www.example.com/pieces/{}.html", i),
            title: format!("Piece <{}>", i),
            inventory: 1,
        }
    }

    #[test]
    fn test_part_is_self_describing() {
        let ctx = PartContext {
            kind: GroupKind::Family,
            key: "freinage",
            label: "Freinage & co",
            part: 2,
            total_parts: 3,
            total_urls: 12_000,
            offset: 5_000,
            prev: Some("part-001.html".to_string()),
            next: Some("part-003.html".to_string()),
        };
        let mut buf = Vec::new();
        render_part(&mut buf, &ctx, &[link(1), link(2)]).unwrap();
        let html = String::from_utf8(buf).unwrap();

        assert!(html.contains("data-part=\"2\""));
        assert!(html.contains("data-parts=\"3\""));
        assert!(html.contains("data-total=\"12000\""));
        assert!(html.contains("rel=\"prev\" href=\"part-001.html\""));
        assert!(html.contains("rel=\"next\" href=\"part-003.html\""));
        assert!(html.contains("<ol start=\"5001\">"));
        assert!(html.contains("Freinage &amp; co"));
        assert!(html.contains("Piece &lt;1&gt;"));
        assert!(html.contains("noindex, follow"));
        assert_eq!(html.matches("<li>").count(), 2);
    }

    #[test]
    fn test_first_part_has_no_prev() {
        let ctx = PartContext {
            kind: GroupKind::Brand,
            key: "renault",
            label: "Renault",
            part: 1,
            total_parts: 1,
            total_urls: 1,
            offset: 0,
            prev: None,
            next: None,
        };
        let mut buf = Vec::new();
        render_part(&mut buf, &ctx, &[link(1)]).unwrap();
        let html = String::from_utf8(buf).unwrap();
        assert!(!html.contains("rel=\"prev\""));
        assert!(!html.contains("rel=\"next\""));
    }

    #[test]
    fn test_global_index_groups_by_kind() {
        let groups = vec![
            GroupSummary {
                kind: GroupKind::Brand,
                key: "renault".to_string(),
                label: "Renault".to_string(),
                url_count: 10,
                part_count: 1,
                index_path: "constructeurs/renault/index.html".to_string(),
            },
            GroupSummary {
                kind: GroupKind::Family,
                key: "freinage".to_string(),
                label: "Freinage".to_string(),
                url_count: 7_000,
                part_count: 2,
                index_path: "clusters/freinage/index.html".to_string(),
            },
        ];
        let mut buf = Vec::new();
        render_global_index(&mut buf, &groups).unwrap();
        let html = String::from_utf8(buf).unwrap();
        let families = html.find("Families").unwrap();
        let brands = html.find("Brands").unwrap();
        assert!(families < brands);
        assert!(html.contains("href=\"clusters/freinage/index.html\""));
        assert!(html.contains("(7000 URLs, 2 parts)"));
    }
}
