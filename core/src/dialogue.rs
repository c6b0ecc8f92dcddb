//! Verification dialogue controller — one call, start to finish.
//!
//! STATE ORDER (fixed, never reordered):
//!   Greeting → LookupCase → VerifyIdentity → ReadTransaction
//!     → AwaitConfirmation → ConfirmSafe | ConfirmFraud → Terminated
//!
//! RULES:
//!   - Nothing from the case is spoken before the identifier matched.
//!   - The store is written only in ConfirmSafe / ConfirmFraud, at most once.
//!   - Empty, unintelligible and timed-out input count against a bound;
//!     they never crash the call.
//!   - A transport failure aborts the call wherever it happens.

use crate::{
    case::{CaseStatus, FraudCase},
    channel::{CallChannel, Heard},
    config::DeskConfig,
    error::{CaseError, TransportError},
    event::CallEvent,
    intent::{Confirmation, IntentClassifier},
    script::CallScript,
    store::CaseStore,
    types::CallId,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueState {
    Greeting,
    LookupCase { name: String },
    VerifyIdentity { case: FraudCase },
    ReadTransaction { case: FraudCase },
    AwaitConfirmation { case: FraudCase },
    ConfirmSafe { case: FraudCase },
    ConfirmFraud { case: FraudCase },
    Terminated { reason: TerminationReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Completed,
    UnknownCustomer,
    VerificationFailed,
    Unresolved,
    AlreadyResolved,
    StoreFailure,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed          => "completed",
            Self::UnknownCustomer    => "unknown_customer",
            Self::VerificationFailed => "verification_failed",
            Self::Unresolved         => "unresolved",
            Self::AlreadyResolved    => "already_resolved",
            Self::StoreFailure       => "store_failure",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Caller,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text:    String,
}

/// Stand-ins written to the transcript instead of caller audio.
pub const SILENCE_MARK: &str = "[silence]";
pub const REDACTED_MARK: &str = "[identifier redacted]";

/// Everything a finished call produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub call_id:               CallId,
    pub customer_name:         Option<String>,
    pub reason:                TerminationReason,
    /// Case status as of the end of the call; `None` if no case was found.
    pub final_status:          Option<CaseStatus>,
    pub confirmation_attempts: u32,
    pub transcript:            Vec<Turn>,
    pub events:                Vec<CallEvent>,
    /// RFC 3339 time each entry of `events` was emitted.
    pub event_times:           Vec<String>,
}

/// A call that ended on a transport failure. Carries what the call got
/// through before the failure so it can still be logged; the store may
/// already have been written.
#[derive(Debug, Error)]
#[error("call {call_id} aborted: {source}")]
pub struct CallAborted {
    pub call_id:               CallId,
    #[source]
    pub source:                TransportError,
    pub customer_name:         Option<String>,
    pub final_status:          Option<CaseStatus>,
    pub confirmation_attempts: u32,
    pub events:                Vec<CallEvent>,
    pub event_times:           Vec<String>,
}

pub struct DialogueController {
    store:      Arc<dyn CaseStore>,
    classifier: Box<dyn IntentClassifier>,
    script:     CallScript,
    config:     DeskConfig,
}

impl DialogueController {
    /// Controller with the phrase table from `config` as its classifier.
    pub fn new(store: Arc<dyn CaseStore>, config: DeskConfig) -> Self {
        Self {
            store,
            classifier: Box::new(config.phrase_table()),
            script: config.script(),
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Drive one call until it terminates.
    pub fn run(
        &self,
        call_id: CallId,
        channel: &mut dyn CallChannel,
    ) -> Result<CallOutcome, CallAborted> {
        let mut call = CallRun::new(call_id);
        log::info!("call {}: started", call.call_id);
        call.emit(CallEvent::CallStarted { call_id: call.call_id.clone() });

        let mut state = DialogueState::Greeting;
        let reason = loop {
            state = match state {
                DialogueState::Terminated { reason } => break reason,
                other => match self.step(&mut call, channel, other) {
                    Ok(next) => next,
                    Err(source) => return Err(call.abort(source)),
                },
            };
        };

        if let Err(source) = self.terminate(&mut call, channel, reason) {
            return Err(call.abort(source));
        }
        Ok(call.finish(reason))
    }

    /// Run the entry action of `state` and return the state that follows.
    fn step(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
        state: DialogueState,
    ) -> Result<DialogueState, TransportError> {
        log::debug!("call {}: entering {}", call.call_id, state_name(&state));
        match state {
            DialogueState::Greeting                 => self.greet(call, channel),
            DialogueState::LookupCase { name }      => Ok(self.lookup(call, &name)),
            DialogueState::VerifyIdentity { case }  => self.verify(call, channel, case),
            DialogueState::ReadTransaction { case } => {
                call.say(channel, &self.script.read_transaction(&case))?;
                call.emit(CallEvent::TransactionDisclosed {
                    customer_name: case.customer_name.clone(),
                });
                Ok(DialogueState::AwaitConfirmation { case })
            }
            DialogueState::AwaitConfirmation { case } => self.await_confirmation(call, channel, case),
            DialogueState::ConfirmSafe { case } => {
                self.confirm(call, channel, case, CaseStatus::ConfirmedSafe)
            }
            DialogueState::ConfirmFraud { case } => {
                self.confirm(call, channel, case, CaseStatus::ConfirmedFraud)
            }
            DialogueState::Terminated { reason } => Ok(DialogueState::Terminated { reason }),
        }
    }

    fn greet(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
    ) -> Result<DialogueState, TransportError> {
        call.say(channel, &self.script.greeting())?;

        for attempt in 1..=self.config.max_input_attempts {
            if attempt > 1 {
                call.say(channel, &self.script.ask_name_again())?;
            }
            let heard = call.hear(channel, self.config.response_timeout(), false)?;
            if let Some(name) = heard.text() {
                return Ok(DialogueState::LookupCase { name: name.to_string() });
            }
            log::warn!("call {}: no name heard (attempt {attempt})", call.call_id);
            call.emit(CallEvent::NameNotHeard { attempt });
        }

        Ok(DialogueState::Terminated { reason: TerminationReason::Unresolved })
    }

    fn lookup(&self, call: &mut CallRun, name: &str) -> DialogueState {
        match self.store.find_case(name) {
            Ok(case) => {
                call.customer_name = Some(case.customer_name.clone());
                call.final_status = Some(case.status);
                call.emit(CallEvent::CaseFound { customer_name: case.customer_name.clone() });
                DialogueState::VerifyIdentity { case }
            }
            Err(CaseError::NotFound { .. }) => {
                log::info!("call {}: no case for '{}'", call.call_id, name.trim());
                call.emit(CallEvent::CaseNotFound { name: name.trim().to_string() });
                DialogueState::Terminated { reason: TerminationReason::UnknownCustomer }
            }
            Err(e) => {
                log::error!("call {}: case lookup failed: {e}", call.call_id);
                call.emit(CallEvent::StoreFailed {
                    operation: "find_case".to_string(),
                    error:     e.to_string(),
                });
                DialogueState::Terminated { reason: TerminationReason::StoreFailure }
            }
        }
    }

    fn verify(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
        case: FraudCase,
    ) -> Result<DialogueState, TransportError> {
        call.say(channel, &self.script.ask_identifier(&case.customer_name))?;

        for attempt in 1..=self.config.max_input_attempts {
            if attempt > 1 {
                call.say(channel, &self.script.ask_identifier_again())?;
            }
            let heard = call.hear(channel, self.config.response_timeout(), true)?;
            let Some(identifier) = heard.text() else {
                log::warn!("call {}: no identifier heard (attempt {attempt})", call.call_id);
                call.emit(CallEvent::IdentifierNotHeard { attempt });
                continue;
            };

            if !self
                .config
                .identifier_match
                .matches(&case.security_identifier, identifier)
            {
                log::warn!(
                    "call {}: identity verification failed for '{}'",
                    call.call_id, case.customer_name
                );
                call.emit(CallEvent::VerificationFailed {
                    customer_name: case.customer_name.clone(),
                });
                return Ok(DialogueState::Terminated {
                    reason: TerminationReason::VerificationFailed,
                });
            }

            call.emit(CallEvent::IdentityVerified { customer_name: case.customer_name.clone() });

            if case.status.is_terminal() {
                call.emit(CallEvent::CaseAlreadyResolved {
                    customer_name: case.customer_name.clone(),
                    status:        case.status,
                });
                return Ok(DialogueState::Terminated {
                    reason: TerminationReason::AlreadyResolved,
                });
            }
            return Ok(DialogueState::ReadTransaction { case });
        }

        Ok(DialogueState::Terminated { reason: TerminationReason::Unresolved })
    }

    fn await_confirmation(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
        case: FraudCase,
    ) -> Result<DialogueState, TransportError> {
        for attempt in 1..=self.config.max_confirmation_attempts {
            let prompt = if attempt == 1 {
                self.script.ask_confirmation()
            } else {
                self.script.reprompt_confirmation()
            };
            call.say(channel, &prompt)?;

            let heard = call.hear(channel, self.config.response_timeout(), false)?;
            let confirmation = heard
                .text()
                .map(|t| self.classifier.classify(t))
                .unwrap_or(Confirmation::Unrecognized);
            call.confirmation_attempts = attempt;
            call.emit(CallEvent::ConfirmationHeard { attempt, confirmation });

            match confirmation {
                Confirmation::Affirmative => return Ok(DialogueState::ConfirmSafe { case }),
                Confirmation::Negative    => return Ok(DialogueState::ConfirmFraud { case }),
                Confirmation::Unrecognized => {
                    log::warn!(
                        "call {}: confirmation not understood (attempt {attempt} of {})",
                        call.call_id, self.config.max_confirmation_attempts
                    );
                }
            }
        }

        Ok(DialogueState::Terminated { reason: TerminationReason::Unresolved })
    }

    fn confirm(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
        case: FraudCase,
        status: CaseStatus,
    ) -> Result<DialogueState, TransportError> {
        match self.store.update_status(&case.customer_name, status) {
            Ok(()) => {
                call.final_status = Some(status);
                call.emit(CallEvent::StatusUpdated {
                    customer_name: case.customer_name.clone(),
                    status,
                });
                let line = match status {
                    CaseStatus::ConfirmedFraud => self.script.confirmed_fraud(&case),
                    _ => self.script.confirmed_safe(),
                };
                call.say(channel, &line)?;
                Ok(DialogueState::Terminated { reason: TerminationReason::Completed })
            }
            Err(CaseError::AlreadyResolved { status: current, .. }) => {
                // Another call resolved the case between lookup and now.
                log::warn!(
                    "call {}: '{}' was resolved elsewhere ({current})",
                    call.call_id, case.customer_name
                );
                let current = self.store.find_case(&case.customer_name).map(|c| c.status);
                if let Ok(current) = current {
                    call.final_status = Some(current);
                    call.emit(CallEvent::CaseAlreadyResolved {
                        customer_name: case.customer_name.clone(),
                        status:        current,
                    });
                }
                Ok(DialogueState::Terminated { reason: TerminationReason::AlreadyResolved })
            }
            Err(e) => {
                log::error!("call {}: status update failed: {e}", call.call_id);
                call.emit(CallEvent::StoreFailed {
                    operation: "update_status".to_string(),
                    error:     e.to_string(),
                });
                Ok(DialogueState::Terminated { reason: TerminationReason::StoreFailure })
            }
        }
    }

    fn terminate(
        &self,
        call: &mut CallRun,
        channel: &mut dyn CallChannel,
        reason: TerminationReason,
    ) -> Result<(), TransportError> {
        call.say(channel, &self.script.closing(reason))?;
        call.emit(CallEvent::CallTerminated { reason });
        if let Err(e) = channel.hang_up() {
            log::warn!("call {}: hang-up failed: {e}", call.call_id);
        }
        log::info!("call {}: ended ({reason})", call.call_id);
        Ok(())
    }
}

/// Per-call working state.
struct CallRun {
    call_id:               CallId,
    customer_name:         Option<String>,
    final_status:          Option<CaseStatus>,
    confirmation_attempts: u32,
    transcript:            Vec<Turn>,
    events:                Vec<CallEvent>,
    event_times:           Vec<String>,
}

impl CallRun {
    fn new(call_id: CallId) -> Self {
        Self {
            call_id,
            customer_name: None,
            final_status: None,
            confirmation_attempts: 0,
            transcript: Vec::new(),
            events: Vec::new(),
            event_times: Vec::new(),
        }
    }

    fn say(&mut self, channel: &mut dyn CallChannel, text: &str) -> Result<(), TransportError> {
        channel.speak(text)?;
        self.transcript.push(Turn { speaker: Speaker::Agent, text: text.to_string() });
        Ok(())
    }

    /// Listen once. With `redact`, the transcript keeps only a marker.
    fn hear(
        &mut self,
        channel: &mut dyn CallChannel,
        timeout: std::time::Duration,
        redact: bool,
    ) -> Result<Heard, TransportError> {
        let heard = channel.listen(timeout)?;
        let text = match (&heard, redact) {
            (Heard::Silence, _)         => SILENCE_MARK.to_string(),
            (Heard::Utterance(_), true) => REDACTED_MARK.to_string(),
            (Heard::Utterance(t), false) => t.clone(),
        };
        self.transcript.push(Turn { speaker: Speaker::Caller, text });
        Ok(heard)
    }

    fn emit(&mut self, event: CallEvent) {
        log::debug!("call {}: {}", self.call_id, event.type_name());
        self.events.push(event);
        self.event_times.push(chrono::Utc::now().to_rfc3339());
    }

    fn abort(self, source: TransportError) -> CallAborted {
        log::warn!("call {}: aborted: {source}", self.call_id);
        CallAborted {
            call_id:               self.call_id,
            source,
            customer_name:         self.customer_name,
            final_status:          self.final_status,
            confirmation_attempts: self.confirmation_attempts,
            events:                self.events,
            event_times:           self.event_times,
        }
    }

    fn finish(self, reason: TerminationReason) -> CallOutcome {
        CallOutcome {
            call_id:               self.call_id,
            customer_name:         self.customer_name,
            reason,
            final_status:          self.final_status,
            confirmation_attempts: self.confirmation_attempts,
            transcript:            self.transcript,
            events:                self.events,
            event_times:           self.event_times,
        }
    }
}

fn state_name(state: &DialogueState) -> &'static str {
    match state {
        DialogueState::Greeting               => "greeting",
        DialogueState::LookupCase { .. }      => "lookup_case",
        DialogueState::VerifyIdentity { .. }  => "verify_identity",
        DialogueState::ReadTransaction { .. } => "read_transaction",
        DialogueState::AwaitConfirmation { .. } => "await_confirmation",
        DialogueState::ConfirmSafe { .. }     => "confirm_safe",
        DialogueState::ConfirmFraud { .. }    => "confirm_fraud",
        DialogueState::Terminated { .. }      => "terminated",
    }
}
