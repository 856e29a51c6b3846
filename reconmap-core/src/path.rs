// Path helpers shared by the sitemap builder and the storage layer

use url::Url;

/// Canonicalize a folder path: absolute, no trailing slash (except for root).
///
/// Total over all inputs: `""` becomes `"/"`, `"api/"` becomes `"/api"`.
pub fn normalize_path(raw: &str) -> String {
    if raw.is_empty() {
        return "/".to_string();
    }

    let mut path = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };

    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    path
}

/// Split a path into its non-empty segments. Root yields no segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join a child segment onto a canonical parent path without doubling the slash.
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent == "/" || parent.is_empty() {
        normalize_path(segment)
    } else {
        normalize_path(&format!("{}/{}", parent, segment))
    }
}

/// The directory an endpoint path lives in: everything before the last `/`.
///
/// `/api/users` lives in `/api`, `/api/` lives in `/api`, `/login` lives in `/`.
pub fn directory_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalize_path(&path[..idx]),
    }
}

/// The path of a URL with its query string re-attached, if it had one.
pub fn path_with_query(url: &Url) -> String {
    let path = if url.path().is_empty() { "/" } else { url.path() };
    match url.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}
