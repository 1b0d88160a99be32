//! Path normalization for project-scoped object keys.

pub const SEPARATOR: char = '/';

/// Normalize to a single leading slash and no trailing slash. The root
/// normalizes to `/`.
pub fn normalize_path(path: &str) -> String {
    format!("{}{}", SEPARATOR, path.trim_matches(SEPARATOR))
}

/// Directory-prefix form of `path`: normalized, with exactly one trailing
/// slash.
pub fn as_directory(path: &str) -> String {
    let normalized = normalize_path(path);
    if normalized.ends_with(SEPARATOR) {
        normalized
    } else {
        normalized + "/"
    }
}

pub fn is_directory(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/// True if `candidate` is `dir` itself, or a direct child of `dir` (a file
/// `dir/name` or a directory marker `dir/name/`).
///
/// `dir` must be in directory-prefix form.
pub fn is_direct_child(dir: &str, candidate: &str) -> bool {
    match candidate.strip_prefix(dir) {
        Some(rest) => {
            let segment = rest.strip_suffix(SEPARATOR).unwrap_or(rest);
            !segment.is_empty() && !segment.contains(SEPARATOR)
        }
        None => false,
    }
}

/// Number of path segments below the root; `/` has depth 0.
pub fn depth(path: &str) -> usize {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).count()
}
