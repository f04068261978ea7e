//! Path helpers shared by the page and alias resolvers.

/// Strip one leading and one trailing `/`, if present.
///
/// `"/a/b/"` becomes `"a/b"`, `"/"` becomes `""`.
pub fn strip_slashes(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Normalize a URL for alias storage and lookup.
///
/// The result always starts with `/` and never ends with one, except for
/// the bare root `/`.
pub fn normalize_url(url: &str) -> String {
    if url.is_empty() {
        return "/".to_string();
    }
    let mut url = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{url}")
    };
    if url.len() > 1 && url.ends_with('/') {
        url.pop();
    }
    url
}

/// The last segment of a path, used as the candidate slug.
pub fn last_segment(path: &str) -> &str {
    let path = path.strip_suffix('/').unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}
