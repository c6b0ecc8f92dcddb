//! Call events — one per observable step of a call.
//!
//! RULE: Events never carry the security identifier, expected or heard.
//! Variants are only ever appended; the call log stores them by name.

use crate::{
    case::CaseStatus,
    dialogue::TerminationReason,
    intent::Confirmation,
    types::{CallId, Seq},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    CallStarted {
        call_id: CallId,
    },

    // ── Identification ─────────────────────────────
    NameNotHeard {
        attempt: u32,
    },
    CaseFound {
        customer_name: String,
    },
    CaseNotFound {
        name: String,
    },

    // ── Verification ───────────────────────────────
    IdentifierNotHeard {
        attempt: u32,
    },
    IdentityVerified {
        customer_name: String,
    },
    VerificationFailed {
        customer_name: String,
    },
    CaseAlreadyResolved {
        customer_name: String,
        status: CaseStatus,
    },

    // ── Confirmation ───────────────────────────────
    TransactionDisclosed {
        customer_name: String,
    },
    ConfirmationHeard {
        attempt: u32,
        confirmation: Confirmation,
    },
    StatusUpdated {
        customer_name: String,
        status: CaseStatus,
    },
    StoreFailed {
        operation: String,
        error: String,
    },

    // ── End of call ────────────────────────────────
    CallTerminated {
        reason: TerminationReason,
    },
    CallAborted {
        error: String,
    },
}

impl CallEvent {
    /// Stable name used for the `event_type` column of the call log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CallStarted { .. }          => "call_started",
            Self::NameNotHeard { .. }         => "name_not_heard",
            Self::CaseFound { .. }            => "case_found",
            Self::CaseNotFound { .. }         => "case_not_found",
            Self::IdentifierNotHeard { .. }   => "identifier_not_heard",
            Self::IdentityVerified { .. }     => "identity_verified",
            Self::VerificationFailed { .. }   => "verification_failed",
            Self::CaseAlreadyResolved { .. }  => "case_already_resolved",
            Self::TransactionDisclosed { .. } => "transaction_disclosed",
            Self::ConfirmationHeard { .. }    => "confirmation_heard",
            Self::StatusUpdated { .. }        => "status_updated",
            Self::StoreFailed { .. }          => "store_failed",
            Self::CallTerminated { .. }       => "call_terminated",
            Self::CallAborted { .. }          => "call_aborted",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub call_id:    CallId,
    pub seq:        Seq,
    pub event_type: String,
    pub payload:    String, // JSON-serialized CallEvent
    pub created_at: String, // RFC 3339
}
