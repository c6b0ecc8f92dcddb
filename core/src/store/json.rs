use super::{apply_status, check_unique, find_in, CaseStore};
use crate::{
    case::{CaseStatus, FraudCase},
    error::{CaseError, CaseResult},
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// File-backed store: a JSON array of cases.
///
/// Every call rereads the file, so a status written by one process is seen
/// by the next one. Writes land in a sibling temp file first and are then
/// renamed over the store, so readers never see a half-written file.
///
/// A status write rewrites the whole file in canonical form, records it
/// did not touch included: camelCase fields come back renamed, `"$1,250.00"`
/// amounts come back as numbers (`500` as `500.0`) and `pending_review`
/// as `pending`. Other tooling reading the file sees those records change.
pub struct JsonCaseStore {
    path: PathBuf,
    // Serializes read-modify-write within this process.
    write_lock: Mutex<()>,
}

impl JsonCaseStore {
    /// Open an existing store. Fails if the file is missing or malformed.
    pub fn open(path: impl AsRef<Path>) -> CaseResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };
        let cases = store.load()?;
        log::debug!("case store {} opened: {} cases", store.path.display(), cases.len());
        Ok(store)
    }

    /// Create (or replace) a store seeded with `cases`.
    pub fn create(path: impl AsRef<Path>, cases: &[FraudCase]) -> CaseResult<Self> {
        check_unique(cases)?;
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };
        store.save(cases)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CaseResult<Vec<FraudCase>> {
        let content = fs::read_to_string(&self.path)?;
        let cases: Vec<FraudCase> = serde_json::from_str(&content)?;
        check_unique(&cases)?;
        Ok(cases)
    }

    fn save(&self, cases: &[FraudCase]) -> CaseResult<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        cases.serialize(&mut ser)?;
        buf.push(b'\n');

        let tmp = self.temp_path();
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CaseStore for JsonCaseStore {
    fn find_case(&self, name: &str) -> CaseResult<FraudCase> {
        find_in(&self.load()?, name)
    }

    fn update_status(&self, name: &str, status: CaseStatus) -> CaseResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| CaseError::Poisoned)?;
        let mut cases = self.load()?;
        apply_status(&mut cases, name, status)?;
        self.save(&cases)?;
        log::info!("case store: '{}' -> {status}", name.trim());
        Ok(())
    }

    fn cases(&self) -> CaseResult<Vec<FraudCase>> {
        self.load()
    }
}
