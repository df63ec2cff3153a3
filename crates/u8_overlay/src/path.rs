//! Path classification and normalization.
//!
//! These functions are pure string logic: they never touch storage. Virtual
//! paths use `/` separators, but `\` is accepted and normalized so paths coming
//! from hosts with either convention classify the same way.

/// The configured override root, normalized once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRoot {
    /// Root with `/` separators and no trailing separator, original case kept.
    prefix: String,
    max_path: usize,
}

impl OverrideRoot {
    pub fn new(root: &str, max_path: usize) -> Self {
        let prefix = root.replace('\\', "/").trim_end_matches('/').to_string();
        Self { prefix, max_path }
    }

    /// The normalized root, e.g. `/files/Mods`.
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn max_path(&self) -> usize {
        self.max_path
    }

    /// Whether `path` lies under the root.
    ///
    /// The comparison ignores ASCII case and requires a separator right after
    /// the root, so `/mods/x` and `/MODS/x` match `/mods` but `/modsfoo` and
    /// `/mods` itself do not. Paths longer than `max_path` are truncated first.
    /// A spelling without the root's leading `/` (`mods/x`) is accepted too.
    pub fn is_under(&self, path: &str) -> bool {
        let path = truncate_path(path, self.max_path).replace('\\', "/");

        if starts_with_dir_ignore_case(&path, &self.prefix) {
            return true;
        }
        match self.prefix.strip_prefix('/') {
            Some(relative) if !relative.is_empty() && !path.starts_with('/') => {
                starts_with_dir_ignore_case(&path, relative)
            }
            _ => false,
        }
    }

    /// Join a root-relative path onto the root.
    pub fn join(&self, relative: &str) -> String {
        let relative = relative.replace('\\', "/");
        format!("{}/{}", self.prefix, relative.trim_start_matches('/'))
    }
}

fn starts_with_dir_ignore_case(path: &str, prefix: &str) -> bool {
    let path = path.as_bytes();
    let prefix = prefix.as_bytes();
    path.len() > prefix.len()
        && path[..prefix.len()].eq_ignore_ascii_case(prefix)
        && path[prefix.len()] == b'/'
}

/// Cut `path` to at most `max` bytes, backing off to a char boundary.
pub fn truncate_path(path: &str, max: usize) -> &str {
    if path.len() <= max {
        return path;
    }
    let mut end = max;
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    &path[..end]
}

/// Lowercase, `/`-separated key with empty components dropped.
///
/// `\UI\\Award/` and `/ui/award` both become `ui/award`.
pub fn normalize_key(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("/")
}

/// Last component of a path.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// `path` without the extension of its last component.
///
/// `/UI/Award.szs` becomes `/UI/Award`; a path without an extension is
/// returned unchanged.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.len() - file_name(path).len();
    match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    }
}

/// File name of `path` without its extension: `/UI/Award.szs` gives `Award`.
pub fn archive_base_name(path: &str) -> &str {
    file_name(strip_extension(path))
}

/// Whether `path` ends with `extension`, ignoring ASCII case.
pub fn has_extension_ignore_case(path: &str, extension: &str) -> bool {
    let path = path.as_bytes();
    let extension = extension.as_bytes();
    path.len() >= extension.len()
        && path[path.len() - extension.len()..].eq_ignore_ascii_case(extension)
}
