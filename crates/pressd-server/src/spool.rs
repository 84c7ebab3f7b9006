// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concrete `SpoolWriter`: writes document bytes under
// `<spool_dir>/jobs/<job_id>/` and reports back the path and size
// `pressd-dispatch` needs to populate a `Document` row. Hashes the
// written bytes the way a write-then-hash spool should, without an
// audit log — integrity logging is a separate concern this crate
// doesn't own.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::instrument;

use pressd_core::error::{PressdError, Result};
use pressd_dispatch::{SpoolReader, SpoolWriter};

pub struct DiskSpool {
    root: PathBuf,
}

impl DiskSpool {
    pub fn new(root: PathBuf) -> Self {
        DiskSpool { root }
    }

    fn job_dir(&self, job_id: i64) -> PathBuf {
        self.root.join("jobs").join(job_id.to_string())
    }
}

impl SpoolWriter for DiskSpool {
    #[instrument(skip(self, data), fields(job_id, ordinal, bytes = data.len()))]
    fn save(&self, job_id: i64, ordinal: i32, file_name: &str, data: &[u8]) -> Result<(String, u64)> {
        let dir = self.job_dir(job_id);
        std::fs::create_dir_all(&dir).map_err(PressdError::Io)?;

        let safe_name = file_name.rsplit('/').next().unwrap_or(file_name);
        let path = dir.join(format!("{ordinal:04}-{safe_name}"));
        std::fs::write(&path, data).map_err(PressdError::Io)?;

        let digest = Sha256::digest(data);
        tracing::debug!(path = %path.display(), sha256 = %hex::encode(digest), "document spooled");

        Ok((path.display().to_string(), data.len() as u64))
    }
}

impl SpoolReader for DiskSpool {
    #[instrument(skip(self), fields(spool_path = %spool_path))]
    fn read(&self, spool_path: &str) -> Result<Vec<u8>> {
        std::fs::read(spool_path).map_err(PressdError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_writes_bytes_and_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let spool = DiskSpool::new(dir.path().to_path_buf());
        let (path, size) = spool.save(42, 1, "report.pdf", b"%PDF-1.4 fake").unwrap();
        assert_eq!(size, 13);
        assert!(std::path::Path::new(&path).exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 fake");
    }

    #[test]
    fn save_strips_path_components_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let spool = DiskSpool::new(dir.path().to_path_buf());
        let (path, _) = spool.save(1, 1, "../../etc/passwd", b"x").unwrap();
        assert!(path.ends_with("0001-passwd"));
    }

    #[test]
    fn read_returns_the_bytes_save_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let spool = DiskSpool::new(dir.path().to_path_buf());
        let (path, _) = spool.save(7, 1, "report.pdf", b"%PDF-1.4 fake").unwrap();
        assert_eq!(spool.read(&path).unwrap(), b"%PDF-1.4 fake");
    }

    #[test]
    fn read_of_a_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let spool = DiskSpool::new(dir.path().to_path_buf());
        assert!(spool.read(dir.path().join("missing").to_str().unwrap()).is_err());
    }
}
