//! The fraud desk — wires the case store, dialogue controller and call log.
//!
//! RULES:
//!   - One call at a time; `run_call` blocks until the call ends.
//!   - Every call gets a row in the call log, aborted calls included.
//!   - Events are persisted after the call, in order, stamped with the time
//!     they were emitted.

use crate::{
    call_log::CallLog,
    case::FraudCase,
    channel::CallChannel,
    config::DeskConfig,
    dialogue::{CallOutcome, DialogueController},
    error::{DeskError, DeskResult},
    event::{CallEvent, EventLogEntry},
    intent::IntentClassifier,
    store::{CaseStore, JsonCaseStore, MemoryCaseStore},
    types::{CallId, Seq},
};
use std::sync::Arc;

/// Reason recorded in the call log for a transport failure.
pub const ABORTED_REASON: &str = "aborted";

pub struct FraudDesk {
    store:      Arc<dyn CaseStore>,
    controller: DialogueController,
    pub log:    CallLog,
}

impl FraudDesk {
    pub fn new(store: Arc<dyn CaseStore>, config: DeskConfig, log: CallLog) -> Self {
        let controller = DialogueController::new(Arc::clone(&store), config);
        Self { store, controller, log }
    }

    /// Desk over a case file and a call log file (`:memory:` allowed).
    pub fn open(cases_path: &str, config: DeskConfig, log_path: &str) -> DeskResult<Self> {
        let store = JsonCaseStore::open(cases_path)?;
        let log = CallLog::open(log_path)?;
        log.migrate()?;
        Ok(Self::new(Arc::new(store), config, log))
    }

    /// In-memory store and call log, test config.
    pub fn build_test(cases: Vec<FraudCase>) -> DeskResult<Self> {
        let store = MemoryCaseStore::new(cases)?;
        let log = CallLog::in_memory()?;
        log.migrate()?;
        Ok(Self::new(Arc::new(store), DeskConfig::default_test(), log))
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.controller = self.controller.with_classifier(classifier);
        self
    }

    pub fn store(&self) -> &dyn CaseStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &DeskConfig {
        self.controller.config()
    }

    /// Run one call over `channel` and record it.
    ///
    /// Named outcomes (unknown customer, failed verification, ...) are
    /// `Ok`. A transport failure is logged as an aborted call and returned
    /// as `DeskError::Transport`.
    pub fn run_call(&self, channel: &mut dyn CallChannel) -> DeskResult<CallOutcome> {
        let call_id: CallId = uuid::Uuid::new_v4().to_string();
        self.log.start_call(&call_id, &now())?;

        match self.controller.run(call_id.clone(), channel) {
            Ok(outcome) => {
                self.record_events(&call_id, &outcome.events, &outcome.event_times)?;
                self.log.finish_call(
                    &call_id,
                    outcome.customer_name.as_deref(),
                    outcome.reason.as_str(),
                    outcome.final_status.map(|s| s.as_str()),
                    outcome.confirmation_attempts,
                    &now(),
                )?;
                Ok(outcome)
            }
            Err(aborted) => {
                let mut events = aborted.events;
                let mut event_times = aborted.event_times;
                events.push(CallEvent::CallAborted { error: aborted.source.to_string() });
                event_times.push(now());
                self.record_events(&call_id, &events, &event_times)?;

                // The status write may have landed before the channel failed.
                self.log.finish_call(
                    &call_id,
                    aborted.customer_name.as_deref(),
                    ABORTED_REASON,
                    aborted.final_status.map(|s| s.as_str()),
                    aborted.confirmation_attempts,
                    &now(),
                )?;
                Err(DeskError::Transport(aborted.source))
            }
        }
    }

    fn record_events(
        &self,
        call_id: &str,
        events: &[CallEvent],
        event_times: &[String],
    ) -> DeskResult<()> {
        for (seq, (event, at)) in events.iter().zip(event_times).enumerate() {
            let entry = EventLogEntry {
                id:         None,
                call_id:    call_id.to_string(),
                seq:        seq as Seq,
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
                created_at: at.clone(),
            };
            self.log.append_event(&entry)?;
        }
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
