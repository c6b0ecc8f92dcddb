use super::{apply_status, check_unique, find_in, CaseStore};
use crate::{
    case::{CaseStatus, FraudCase},
    error::{CaseError, CaseResult},
};
use std::sync::Mutex;

/// In-process store with the same contract as `JsonCaseStore`.
/// Used to drive the dialogue controller in tests.
pub struct MemoryCaseStore {
    cases: Mutex<Vec<FraudCase>>,
}

impl MemoryCaseStore {
    pub fn new(cases: Vec<FraudCase>) -> CaseResult<Self> {
        check_unique(&cases)?;
        Ok(Self { cases: Mutex::new(cases) })
    }
}

impl CaseStore for MemoryCaseStore {
    fn find_case(&self, name: &str) -> CaseResult<FraudCase> {
        let cases = self.cases.lock().map_err(|_| CaseError::Poisoned)?;
        find_in(&cases, name)
    }

    fn update_status(&self, name: &str, status: CaseStatus) -> CaseResult<()> {
        let mut cases = self.cases.lock().map_err(|_| CaseError::Poisoned)?;
        apply_status(&mut cases, name, status)
    }

    fn cases(&self) -> CaseResult<Vec<FraudCase>> {
        let cases = self.cases.lock().map_err(|_| CaseError::Poisoned)?;
        Ok(cases.clone())
    }
}
