//! Case store — the only persistent state the desk owns.
//!
//! RULE: Only the store touches the case file.
//! The dialogue controller reads and writes cases through `CaseStore`,
//! never through the file directly.
//!
//! Persistence is whole-store: load every record, change one in memory,
//! write every record back.

mod json;
mod memory;

pub use json::JsonCaseStore;
pub use memory::MemoryCaseStore;

use crate::{
    case::{normalize_name, CaseStatus, FraudCase},
    error::{CaseError, CaseResult},
};
use std::collections::HashSet;

pub trait CaseStore: Send + Sync {
    /// Case-insensitive exact match on `customer_name`.
    /// Never guesses: no prefix, substring or fuzzy matching.
    fn find_case(&self, name: &str) -> CaseResult<FraudCase>;

    /// Overwrite `status` of the matching case and persist the store.
    /// No other field of any record changes.
    fn update_status(&self, name: &str, status: CaseStatus) -> CaseResult<()>;

    /// Every case, in storage order.
    fn cases(&self) -> CaseResult<Vec<FraudCase>>;
}

fn find_in(cases: &[FraudCase], name: &str) -> CaseResult<FraudCase> {
    cases
        .iter()
        .find(|c| c.matches_name(name))
        .cloned()
        .ok_or_else(|| CaseError::NotFound { name: name.trim().to_string() })
}

/// The status write shared by every store implementation.
fn apply_status(cases: &mut [FraudCase], name: &str, status: CaseStatus) -> CaseResult<()> {
    let case = cases
        .iter_mut()
        .find(|c| c.matches_name(name))
        .ok_or_else(|| CaseError::NotFound { name: name.trim().to_string() })?;

    if !status.is_terminal() {
        return Err(CaseError::InvalidTransition {
            name:   case.customer_name.clone(),
            status: status.to_string(),
        });
    }
    if case.status.is_terminal() {
        return Err(CaseError::AlreadyResolved {
            name:   case.customer_name.clone(),
            status: case.status.to_string(),
        });
    }

    case.status = status;
    Ok(())
}

/// One record per customer name, compared the way lookups compare.
fn check_unique(cases: &[FraudCase]) -> CaseResult<()> {
    let mut seen = HashSet::new();
    for case in cases {
        if !seen.insert(normalize_name(&case.customer_name)) {
            return Err(CaseError::DuplicateCase { name: case.customer_name.clone() });
        }
    }
    Ok(())
}
