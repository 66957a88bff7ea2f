// src/paths/patterns.rs

//! File-name pattern vocabulary shared by input listing, predecessor output
//! selection and ignore lists.
//!
//! | pattern  | matches                                                    |
//! |----------|------------------------------------------------------------|
//! | `^.bam`  | names ending in `.bam`                                     |
//! | `hepg2^` | names starting with `hepg2`                                |
//! | `^R1^`   | `R1` after the first `_`, `-` or `.` (e.g. `x_R1.fastq.gz`) |
//! | `I1`     | `I1` anywhere                                              |
//! | (empty)  | everything                                                 |
//!
//! Matching is case-insensitive.

use std::fmt;
use std::str::FromStr;

use crate::paths::template::FOLDER;

const MARKER: char = '^';
const SEPARATORS: [char; 3] = ['_', '-', '.'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePattern {
    Any,
    Suffix(String),
    Prefix(String),
    Infix(String),
    Substring(String),
}

impl FilePattern {
    /// Parse a raw pattern, rejecting stray or doubled `^` markers.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let p = raw.trim().to_lowercase();
        if p.is_empty() {
            return Ok(FilePattern::Any);
        }

        let leading = p.starts_with(MARKER);
        let trailing = p.len() > 1 && p.ends_with(MARKER);
        let body = match (leading, trailing) {
            (true, true) => &p[1..p.len() - 1],
            (true, false) => &p[1..],
            (false, true) => &p[..p.len() - 1],
            (false, false) => p.as_str(),
        };

        if body.is_empty() || body.contains(MARKER) {
            return Err(format!(
                "invalid file pattern '{raw}': '^' may only appear at the start and/or end of a non-empty token"
            ));
        }

        let body = body.to_string();
        Ok(match (leading, trailing) {
            (true, true) => FilePattern::Infix(body),
            (true, false) => FilePattern::Suffix(body),
            (false, true) => FilePattern::Prefix(body),
            (false, false) => FilePattern::Substring(body),
        })
    }

    /// Whether `file_name` (a bare name, not a path) matches this pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        match self {
            FilePattern::Any => true,
            FilePattern::Suffix(s) => name.ends_with(s.as_str()),
            FilePattern::Prefix(s) => name.starts_with(s.as_str()),
            FilePattern::Infix(s) => match name.find(SEPARATORS) {
                Some(idx) => name[idx..].contains(s.as_str()),
                None => false,
            },
            FilePattern::Substring(s) => name.contains(s.as_str()),
        }
    }
}

impl FromStr for FilePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilePattern::parse(s)
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilePattern::Any => Ok(()),
            FilePattern::Suffix(s) => write!(f, "^{s}"),
            FilePattern::Prefix(s) => write!(f, "{s}^"),
            FilePattern::Infix(s) => write!(f, "^{s}^"),
            FilePattern::Substring(s) => f.write_str(s),
        }
    }
}

/// True if any pattern matches; an empty pattern list matches everything.
pub fn matches_any(file_name: &str, patterns: &[FilePattern]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.matches(file_name))
}

/// One entry of a stage's `input_file` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPattern {
    /// Template containing `<folder>`: resolves to a predecessor's output
    /// directory rather than to individual files.
    Folder(String),
    /// Selects predecessor outputs by file name.
    File(FilePattern),
}

impl InputPattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.contains(FOLDER) {
            Ok(InputPattern::Folder(raw.to_string()))
        } else {
            FilePattern::parse(raw).map(InputPattern::File)
        }
    }
}
