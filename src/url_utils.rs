//! URL utilities shared by the writers, the scorer and the hub generator.

use url::Url;

/// Join a site-relative path onto the configured base URL.
pub fn absolute_url(base: &Url, path: &str) -> Result<String, String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path)
            .map(|u| u.to_string())
            .map_err(|e| e.to_string());
    }
    base.join(path).map(|u| u.to_string()).map_err(|e| e.to_string())
}

/// Page identity used by the canonical check: path plus query, with scheme,
/// host and fragment dropped and trailing slashes ignored (except root).
/// Path case and the query string are significant.
pub fn canonical_identity(url_or_path: &str) -> String {
    let trimmed = url_or_path.trim();
    let parsed = Url::parse(trimmed).or_else(|_| Url::parse(RELATIVE_BASE).and_then(|base| base.join(trimmed)));

    let (mut path, query) = match &parsed {
        Ok(url) => (url.path().to_string(), url.query().map(str::to_string)),
        Err(_) => {
            let without_fragment = strip_fragment(trimmed);
            match without_fragment.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (without_fragment.to_string(), None),
            }
        }
    };

    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path,
    }
}

const RELATIVE_BASE: &str = "http://relative.invalid/";

/// True when a canonical URL designates the page served at `own`.
pub fn same_page(canonical: &str, own: &str) -> bool {
    canonical_identity(canonical) == canonical_identity(own)
}

/// Run-wide identity of a canonical path: the path exactly as stored, minus
/// any `#fragment`. Case and query variants are distinct URLs.
pub fn dedup_key(path: &str) -> String {
    strip_fragment(path.trim()).to_string()
}

fn strip_fragment(url_or_path: &str) -> &str {
    match url_or_path.find('#') {
        Some(end) => &url_or_path[..end],
        None => url_or_path,
    }
}

/// Hub group keys become directory names, so only `[a-z0-9-]` is accepted.
pub fn is_valid_slug(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('-')
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
