//! Revocation ledger.
//!
//! An unsigned JSON document mapping license identifiers to the unix time
//! they were revoked:
//!
//! ```json
//! {"issuer": "acme.example", "keys": {"<license id>": 1767225600}}
//! ```
//!
//! One ledger belongs to one issuer. Persisting never overwrites entries
//! written by someone else: the file is locked, re-read, merged, and
//! replaced by atomic rename. Duplicate identifiers resolve to the later
//! timestamp.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::claims;
use crate::license::License;

/// Errors from loading or persisting a revocation ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger on disk belongs to another issuer.
    #[error("Ledger issuer mismatch: expected {expected}, found {found}")]
    IssuerMismatch {
        /// Issuer of the in-memory ledger.
        expected: String,
        /// Issuer found in the other ledger.
        found: String,
    },

    /// Ledger file is not valid.
    #[error("Malformed ledger {}: {reason}", path.display())]
    Malformed {
        /// File involved.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// File could not be read, written, or locked.
    #[error("Ledger I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Revocation status for a license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationStatus {
    /// License ID that was checked.
    pub license_id: String,
    /// Whether the license is revoked.
    pub revoked: bool,
    /// When it was revoked, if it is.
    pub revoked_at: Option<i64>,
}

/// Mergeable record of revoked license identifiers for one issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationLedger {
    issuer: String,
    #[serde(default)]
    keys: BTreeMap<String, i64>,
}

impl RevocationLedger {
    /// Empty ledger for `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            keys: BTreeMap::new(),
        }
    }

    /// Issuer whose licenses this ledger revokes.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Number of revoked identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing has been revoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Revoked identifiers and their revocation times, sorted by identifier.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i64)> {
        self.keys.iter().map(|(id, at)| (id.as_str(), *at))
    }

    /// Revocation time of `license_id`, if revoked.
    #[must_use]
    pub fn revoked_at(&self, license_id: &str) -> Option<i64> {
        self.keys.get(license_id).copied()
    }

    /// Revoke `license_id` now. Re-adding an identifier updates its time.
    pub fn add_key(&mut self, license_id: impl Into<String>) {
        self.add_key_at(license_id, claims::now());
    }

    /// Revoke `license_id` at `revoked_at` (unix seconds).
    pub fn add_key_at(&mut self, license_id: impl Into<String>, revoked_at: i64) {
        let license_id = license_id.into();
        debug!(license_id = %license_id, revoked_at, "Recorded revocation");
        self.keys.insert(license_id, revoked_at);
    }

    /// Fold `other` into this ledger, keeping the later timestamp for
    /// identifiers present in both.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IssuerMismatch`] if the issuers differ.
    pub fn merge(&mut self, other: &RevocationLedger) -> Result<(), LedgerError> {
        if other.issuer != self.issuer {
            return Err(LedgerError::IssuerMismatch {
                expected: self.issuer.clone(),
                found: other.issuer.clone(),
            });
        }

        for (id, &at) in &other.keys {
            self.keys
                .entry(id.clone())
                .and_modify(|existing| *existing = (*existing).max(at))
                .or_insert(at);
        }
        Ok(())
    }

    /// Check whether `license` is revoked.
    ///
    /// A hit only counts when the ledger's issuer matches the license's.
    #[must_use]
    pub fn is_revoked(&self, license: &License) -> RevocationStatus {
        let revoked_at = if license.issuer == self.issuer {
            self.revoked_at(&license.id)
        } else {
            if self.keys.contains_key(&license.id) {
                debug!(
                    license_id = %license.id,
                    license_issuer = %license.issuer,
                    ledger_issuer = %self.issuer,
                    "Ignoring revocation from another issuer's ledger"
                );
            }
            None
        };

        RevocationStatus {
            license_id: license.id.clone(),
            revoked: revoked_at.is_some(),
            revoked_at,
        }
    }

    /// Read a ledger file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, is not a ledger document,
    /// or has an empty issuer.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| LedgerError::io(path, e))?;
        let ledger: Self = serde_json::from_slice(&bytes).map_err(|e| LedgerError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if ledger.issuer.is_empty() {
            return Err(LedgerError::Malformed {
                path: path.to_path_buf(),
                reason: "issuer is empty".to_string(),
            });
        }

        debug!(path = %path.display(), entries = ledger.len(), "Loaded revocation ledger");
        Ok(ledger)
    }

    /// Merge this ledger into the file at `path` and write the result back.
    ///
    /// Holds an exclusive lock on `<path>.lock` for the whole
    /// read-merge-write, and replaces the file by atomic rename. On success
    /// `self` holds the merged contents.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IssuerMismatch`] if the file belongs to another
    /// issuer, or an I/O / parse error. The file is untouched on error.
    pub fn persist(&mut self, path: impl AsRef<Path>) -> Result<(), LedgerError> {
        let path = path.as_ref();
        let lock_path = lock_path_for(path);

        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LedgerError::io(&lock_path, e))?;
        FileExt::lock_exclusive(&lock).map_err(|e| LedgerError::io(&lock_path, e))?;

        // released when `lock` is dropped
        self.merge_and_write(path)
    }

    fn merge_and_write(&mut self, path: &Path) -> Result<(), LedgerError> {
        let merged = if path.exists() {
            let on_disk = Self::load(path)?;
            let mut merged = self.clone();
            merged.merge(&on_disk)?;
            merged
        } else {
            self.clone()
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| LedgerError::io(parent, e))?;
        serde_json::to_writer_pretty(&mut temp, &merged).map_err(|e| LedgerError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        // NamedTempFile is created 0600; the ledger is meant to be distributed
        set_shared_readable(temp.as_file()).map_err(|e| LedgerError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| LedgerError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| LedgerError::io(path, e.error))?;

        info!(
            path = %path.display(),
            issuer = %merged.issuer,
            entries = merged.len(),
            "Persisted revocation ledger"
        );
        *self = merged;
        Ok(())
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(unix)]
fn set_shared_readable(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_shared_readable(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
