use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    File,
    Folder,
}

impl FixtureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureKind::File => "file",
            FixtureKind::Folder => "folder",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(FixtureKind::File),
            "folder" => Some(FixtureKind::Folder),
            _ => None,
        }
    }
}

/// Catalog record for a staged asset. Content lives on disk under the
/// fixtures root, mirrored at the logical path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fixture {
    pub path: String,
    pub kind: FixtureKind,
    pub size: i64,
    pub permissions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validate a nine-character `rwx` permission string and translate it to an
/// octal mode, e.g. `rwxr-xr-x` → `0o755`.
pub fn parse_permissions(s: &str) -> Option<u32> {
    if s.len() != 9 {
        return None;
    }
    let mut mode = 0u32;
    for (i, c) in s.chars().enumerate() {
        let expected = match i % 3 {
            0 => 'r',
            1 => 'w',
            _ => 'x',
        };
        mode <<= 1;
        if c == expected {
            mode |= 1;
        } else if c != '-' {
            return None;
        }
    }
    Some(mode)
}

/// Reject paths that could escape the fixtures root. Forward slashes are
/// folder separators; `..` and backslashes are never allowed.
pub fn valid_fixture_path(path: &str) -> bool {
    if path.is_empty() || path.contains('\\') || path.starts_with('/') || path.ends_with('/') {
        return false;
    }
    path.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}
