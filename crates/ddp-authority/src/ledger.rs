//! Append-only serial-allocation ledger.
//!
//! One JSON line per issuance. The ledger is created empty at setup, loaded
//! fully when the authority opens, appended on every issuance and never
//! pruned. Serial allocation is monotonic; a collision against the loaded
//! ledger is reported, never ignored.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, AuthorityResult};
use crate::profile::CertificateTier;

/// One issuance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Allocated certificate serial, 16 hex digits.
    pub serial: String,
    /// Tier the certificate was issued for.
    pub tier: CertificateTier,
    /// Free-form label (device serial number for leaf certificates).
    pub label: String,
    /// Issuance timestamp.
    pub issued_at: DateTime<Utc>,
}

/// The serial ledger file.
#[derive(Debug)]
pub struct SerialLedger {
    path: PathBuf,
    issued: BTreeSet<String>,
    next: u64,
}

impl SerialLedger {
    /// Create a fresh, empty ledger file, truncating any existing one.
    ///
    /// # Errors
    ///
    /// Propagates filesystem failures.
    pub fn create(path: impl Into<PathBuf>) -> AuthorityResult<Self> {
        let path = path.into();
        File::create(&path)?;
        Ok(Self {
            path,
            issued: BTreeSet::new(),
            next: 1,
        })
    }

    /// Open an existing ledger, loading every recorded serial.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::CorruptState`] when a line cannot be
    /// parsed, and propagates filesystem failures.
    pub fn open(path: impl Into<PathBuf>) -> AuthorityResult<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let mut issued = BTreeSet::new();
        let mut next = 1u64;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LedgerEntry =
                serde_json::from_str(&line).map_err(|e| AuthorityError::CorruptState {
                    detail: format!("ledger line {}: {e}", index + 1),
                })?;
            let value =
                u64::from_str_radix(&entry.serial, 16).map_err(|e| AuthorityError::CorruptState {
                    detail: format!("ledger serial {:?}: {e}", entry.serial),
                })?;
            next = next.max(value + 1);
            issued.insert(entry.serial);
        }
        Ok(Self { path, issued, next })
    }

    /// Allocate the next serial and record the issuance.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::SerialCollision`] if the allocated serial
    /// was already recorded, and propagates append failures.
    pub fn allocate(
        &mut self,
        tier: CertificateTier,
        label: impl Into<String>,
    ) -> AuthorityResult<String> {
        let serial = format!("{:016x}", self.next);
        if self.issued.contains(&serial) {
            return Err(AuthorityError::SerialCollision { serial });
        }

        let entry = LedgerEntry {
            serial: serial.clone(),
            tier,
            label: label.into(),
            issued_at: Utc::now(),
        };
        self.append(&entry)?;
        self.issued.insert(serial.clone());
        self.next += 1;
        Ok(serial)
    }

    /// Whether `serial` has been issued by this ledger.
    #[must_use]
    pub fn contains(&self, serial: &str) -> bool {
        self.issued.contains(serial)
    }

    /// Number of recorded issuances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &LedgerEntry) -> AuthorityResult<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let line = serde_json::to_string(entry).map_err(|e| AuthorityError::CorruptState {
            detail: format!("ledger entry: {e}"),
        })?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocations_are_unique_and_monotonic() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ledger.jsonl");
        let mut ledger = SerialLedger::create(&path).expect("create");

        let a = ledger
            .allocate(CertificateTier::Root, "root")
            .expect("allocate");
        let b = ledger
            .allocate(CertificateTier::Device, "0011223344556677")
            .expect("allocate");
        assert_ne!(a, b);
        assert_eq!(a, "0000000000000001");
        assert_eq!(b, "0000000000000002");
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn reopen_continues_past_recorded_serials() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ledger.jsonl");
        {
            let mut ledger = SerialLedger::create(&path).expect("create");
            ledger
                .allocate(CertificateTier::Root, "root")
                .expect("allocate");
            ledger
                .allocate(CertificateTier::Batch, "batch")
                .expect("allocate");
        }

        let mut reopened = SerialLedger::open(&path).expect("open");
        assert_eq!(reopened.len(), 2);
        let next = reopened
            .allocate(CertificateTier::Device, "0011223344556677")
            .expect("allocate");
        assert_eq!(next, "0000000000000003");
        assert!(reopened.contains("0000000000000001"));
    }

    #[test]
    fn corrupt_line_is_reported() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ledger.jsonl");
        std::fs::write(&path, "not json\n").expect("write");
        let err = SerialLedger::open(&path).expect_err("corrupt");
        assert!(matches!(err, AuthorityError::CorruptState { .. }));
    }
}
