//! Order-independent checksum over a directory tree.
//!
//! Every included regular file contributes its `/`-separated path relative
//! to the root and the hex SHA-256 of its contents. Pairs are folded into one
//! SHA-256 in lexicographic path order as `path NUL content-hash LF`, so the
//! result depends only on paths and contents: not on traversal order, the
//! host's path separator, or timestamps.
//!
//! Exclusion patterns come in three forms:
//!
//! - `name/` excludes the directory at that relative path and everything
//!   below it
//! - a pattern containing `/` is a glob over the whole relative path
//! - anything else is a glob over the entry's file name, at any depth
//!
//! Globs support `*` (any run of characters) and `?` (one character).
//! Symlinks and special files are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TrustError;

/// Prefix on every directory checksum.
pub const CHECKSUM_PREFIX: &str = "sha256:";

/// Checksum of a directory and the files that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryChecksum {
    /// `sha256:` followed by the hex digest.
    pub checksum: String,
    /// Included files (relative path to hex content hash), sorted by path.
    pub files: BTreeMap<String, String>,
}

impl DirectoryChecksum {
    /// Included file paths in sorted order.
    #[must_use]
    pub fn file_list(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// Compute the checksum of `dir`, skipping entries matched by `exclusions`.
///
/// # Errors
///
/// Returns [`TrustError::Io`] if `dir` or anything below it cannot be read.
pub fn compute_checksum<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    exclusions: &[S],
) -> Result<DirectoryChecksum, TrustError> {
    let dir = dir.as_ref();
    let rules = ExclusionRules::new(exclusions);

    let mut files = BTreeMap::new();
    collect_files(dir, "", &rules, &mut files)?;

    let mut hasher = Sha256::new();
    for (path, hash) in &files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    let checksum = format!("{}{}", CHECKSUM_PREFIX, hex::encode(hasher.finalize()));

    debug!(dir = %dir.display(), files = files.len(), checksum = %checksum, "Computed directory checksum");
    Ok(DirectoryChecksum { checksum, files })
}

fn collect_files(
    dir: &Path,
    prefix: &str,
    rules: &ExclusionRules,
    files: &mut BTreeMap<String, String>,
) -> Result<(), TrustError> {
    let entries = fs::read_dir(dir).map_err(|e| TrustError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TrustError::io(dir, e))?;
        let path = entry.path();
        // Lossy conversion would let distinct names collide on one key.
        let name = entry.file_name().into_string().map_err(|_| {
            TrustError::io(
                &path,
                io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
            )
        })?;
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        // file_type() does not follow symlinks
        let file_type = entry.file_type().map_err(|e| TrustError::io(&path, e))?;

        if rules.matches(&relative, &name, file_type.is_dir()) {
            debug!(path = %relative, "Excluded from checksum");
            continue;
        }

        if file_type.is_dir() {
            collect_files(&path, &relative, rules, files)?;
        } else if file_type.is_file() {
            let hash = hash_file(&path).map_err(|e| TrustError::io(&path, e))?;
            files.insert(relative, hash);
        } else {
            debug!(path = %relative, "Skipping non-regular file");
        }
    }

    Ok(())
}

/// SHA-256 of a file's contents, hex encoded.
fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExclusionRule {
    Directory(String),
    PathGlob(String),
    NameGlob(String),
}

#[derive(Debug, Default)]
struct ExclusionRules {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRules {
    fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let rules = patterns
            .iter()
            .filter_map(|p| parse_rule(p.as_ref()))
            .collect();
        Self { rules }
    }

    fn matches(&self, relative: &str, name: &str, is_dir: bool) -> bool {
        self.rules.iter().any(|rule| match rule {
            ExclusionRule::Directory(dir) => is_dir && relative == dir,
            ExclusionRule::PathGlob(glob) => glob_match(glob, relative),
            ExclusionRule::NameGlob(glob) => glob_match(glob, name),
        })
    }
}

fn parse_rule(pattern: &str) -> Option<ExclusionRule> {
    let normalized = pattern.trim().replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    if normalized.is_empty() {
        return None;
    }

    if let Some(dir) = normalized.strip_suffix('/') {
        let dir = dir.trim_end_matches('/');
        return (!dir.is_empty()).then(|| ExclusionRule::Directory(dir.to_string()));
    }

    if normalized.contains('/') {
        Some(ExclusionRule::PathGlob(normalized.to_string()))
    } else {
        Some(ExclusionRule::NameGlob(normalized.to_string()))
    }
}

/// Match `text` against a glob with `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // position of the last `*` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, absorbed)) = backtrack {
            p = star + 1;
            t = absorbed + 1;
            backtrack = Some((star, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
