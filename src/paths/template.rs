// src/paths/template.rs

//! Placeholder expansion and small path-string helpers.
//!
//! Paths are handled as plain strings rather than `PathBuf`s because most of
//! them are object-store URIs (`s3://bucket/...`) that never touch the local
//! filesystem.

/// Replaced by the current sample (or merged group) id.
pub const SAMPLE_ID: &str = "<sample_id>";
/// Replaced by the run identifier.
pub const RUN_ID: &str = "<run_id>";
/// Replaced by the team identifier.
pub const TEAM_ID: &str = "<team_id>";
/// Replaced by the user identifier.
pub const USER_ID: &str = "<user_id>";
/// Refers to a predecessor stage's whole output directory.
pub const FOLDER: &str = "<folder>";

/// Ordered set of `<key>` → value substitutions.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: Vec<(&'static str, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a substitution.
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
        self
    }

    /// Replace every known placeholder in `template`.
    ///
    /// Unknown `<...>` tokens are left untouched.
    pub fn expand(&self, template: &str) -> String {
        self.values
            .iter()
            .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
    }
}

/// Normalise a directory location so it ends in exactly one `/`.
pub fn ensure_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

/// Join a relative segment onto a base location.
///
/// An empty segment yields the base as a directory; a segment that is already
/// absolute (or a URI) is returned unchanged.
pub fn join(base: &str, segment: &str) -> String {
    if segment.is_empty() {
        return ensure_trailing_slash(base);
    }
    if base.is_empty() || segment.starts_with('/') || segment.contains("://") {
        return segment.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// Last path segment. Directory locations (trailing `/`) have an empty name.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything up to the last `/` (exclusive). Empty for bare names.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_all_known_placeholders() {
        let p = Placeholders::new()
            .with(RUN_ID, "RUN1")
            .with(SAMPLE_ID, "sample1");
        assert_eq!(
            p.expand("s3://foo/<run_id>/<sample_id>.out"),
            "s3://foo/RUN1/sample1.out"
        );
        assert_eq!(p.expand("<team_id>/x"), "<team_id>/x");
    }

    #[test]
    fn later_with_overrides_earlier_value() {
        let p = Placeholders::new()
            .with(SAMPLE_ID, "a")
            .with(SAMPLE_ID, "b");
        assert_eq!(p.expand("<sample_id>"), "b");
    }

    #[test]
    fn join_handles_slashes_and_uris() {
        assert_eq!(join("s3://bam/", "s1.bam"), "s3://bam/s1.bam");
        assert_eq!(join("s3://bam", "s1.bam"), "s3://bam/s1.bam");
        assert_eq!(join("s3://bam", ""), "s3://bam/");
        assert_eq!(join("s3://bam", "s3://other/x.bam"), "s3://other/x.bam");
        assert_eq!(join("", "x.bam"), "x.bam");
    }

    #[test]
    fn file_name_and_parent() {
        assert_eq!(file_name("/a/b/c.txt"), "c.txt");
        assert_eq!(file_name("/a/b/"), "");
        assert_eq!(parent_dir("/a/b/c.txt"), "/a/b");
        assert_eq!(parent_dir("c.txt"), "");
        assert_eq!(ensure_trailing_slash("/a/b//"), "/a/b/");
    }
}
