//! Fraud desk tests: calls end to end, with the call log.
//!
//! Covers: call rows for every outcome, ordered and timestamped event rows,
//! aborted calls (before and after the status write), call history per
//! customer, and a file-backed desk across restarts.

use fraud_desk_core::{
    call_log::CallLog,
    case::{CaseStatus, FraudCase},
    channel::{CallChannel, Heard, ScriptedChannel},
    config::DeskConfig,
    desk::{FraudDesk, ABORTED_REASON},
    dialogue::TerminationReason,
    error::{DeskError, DeskResult, TransportError},
    event::CallEvent,
    store::{CaseStore, JsonCaseStore},
};
use serde_json::json;
use std::time::Duration;

fn cases() -> Vec<FraudCase> {
    ["Alice", "John"]
        .iter()
        .zip(["1234", "12345"])
        .map(|(name, id)| {
            serde_json::from_value(json!({
                "customer_name": name,
                "security_identifier": id,
                "transaction_amount": 500.0,
                "merchant": "Acme",
                "transaction_time": "yesterday at 9:40 PM",
                "source": "acme.com",
                "card_last4": "4821"
            }))
            .expect("valid case")
        })
        .collect()
}

fn build() -> FraudDesk {
    FraudDesk::build_test(cases()).expect("build test desk")
}

/// Scripted caller whose line drops on the first prompt spoken after
/// `drop_after` answers, and who takes `pause` to answer each prompt.
struct DroppingChannel {
    inner:      ScriptedChannel,
    drop_after: usize,
    pause:      Duration,
}

impl DroppingChannel {
    fn new(lines: &[&str], drop_after: usize) -> Self {
        Self {
            inner: ScriptedChannel::from_lines(lines.iter()),
            drop_after,
            pause: Duration::ZERO,
        }
    }
}

impl CallChannel for DroppingChannel {
    fn speak(&mut self, text: &str) -> Result<(), TransportError> {
        if self.inner.listens() >= self.drop_after {
            return Err(TransportError::HungUp);
        }
        self.inner.speak(text)
    }

    fn listen(&mut self, timeout: Duration) -> Result<Heard, TransportError> {
        std::thread::sleep(self.pause);
        self.inner.listen(timeout)
    }

    fn hang_up(&mut self) -> Result<(), TransportError> {
        self.inner.hang_up()
    }
}

#[test]
fn completed_call_is_logged() -> DeskResult<()> {
    let desk = build();
    let outcome = desk.run_call(&mut ScriptedChannel::from_lines(["Alice", "1234", "no"]))?;

    let record = desk.log.call(&outcome.call_id)?.expect("call row");
    assert_eq!(record.customer_name.as_deref(), Some("Alice"));
    assert_eq!(record.reason.as_deref(), Some("completed"));
    assert_eq!(record.final_status.as_deref(), Some("confirmed_fraud"));
    assert_eq!(record.confirmation_attempts, 1);
    assert!(record.ended_at.is_some());

    let entries = desk.log.events_for_call(&outcome.call_id)?;
    assert_eq!(entries.len(), outcome.events.len());
    for (seq, (entry, event)) in entries.iter().zip(&outcome.events).enumerate() {
        assert_eq!(entry.seq as usize, seq);
        assert_eq!(entry.event_type, event.type_name());
        let decoded: CallEvent = serde_json::from_str(&entry.payload)?;
        assert_eq!(&decoded, event);
    }
    assert_eq!(entries.first().unwrap().event_type, "call_started");
    assert_eq!(entries.last().unwrap().event_type, "call_terminated");
    Ok(())
}

#[test]
fn named_outcomes_are_logged() -> DeskResult<()> {
    let desk = build();
    let scripts: [(&[&str], TerminationReason); 3] = [
        (&["Bob"], TerminationReason::UnknownCustomer),
        (&["John", "99999"], TerminationReason::VerificationFailed),
        (&["John", "12345", "maybe", "maybe", ""], TerminationReason::Unresolved),
    ];

    for (lines, expected) in scripts {
        let outcome = desk.run_call(&mut ScriptedChannel::from_lines(lines.iter()))?;
        assert_eq!(outcome.reason, expected);
        let record = desk.log.call(&outcome.call_id)?.expect("call row");
        assert_eq!(record.reason.as_deref(), Some(expected.as_str()));
    }

    assert_eq!(desk.log.call_count()?, 3);
    assert_eq!(desk.store().find_case("John")?.status, CaseStatus::Pending);
    Ok(())
}

#[test]
fn aborted_call_is_logged_and_returned() -> DeskResult<()> {
    let desk = build();
    let result = desk.run_call(&mut ScriptedChannel::from_lines(["Alice", "1234"]));

    assert!(matches!(result, Err(DeskError::Transport(TransportError::HungUp))));
    assert_eq!(desk.store().find_case("Alice")?.status, CaseStatus::Pending);

    let calls = desk.log.calls_for_customer("alice")?;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].reason.as_deref(), Some(ABORTED_REASON));
    assert_eq!(calls[0].final_status.as_deref(), Some("pending"));
    assert_eq!(calls[0].confirmation_attempts, 0);

    let entries = desk.log.events_for_call(&calls[0].call_id)?;
    assert_eq!(entries.last().unwrap().event_type, "call_aborted");
    Ok(())
}

/// The line drops while the fraud acknowledgment is spoken: the status is
/// already written, and the call row must say so.
#[test]
fn abort_after_status_write_logs_written_status() -> DeskResult<()> {
    let desk = build();
    let mut channel = DroppingChannel::new(&["Alice", "1234", "no"], 3);
    let result = desk.run_call(&mut channel);

    assert!(matches!(result, Err(DeskError::Transport(TransportError::HungUp))));
    assert_eq!(desk.store().find_case("Alice")?.status, CaseStatus::ConfirmedFraud);

    let calls = desk.log.calls_for_customer("Alice")?;
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.customer_name.as_deref(), Some("Alice"));
    assert_eq!(call.reason.as_deref(), Some(ABORTED_REASON));
    assert_eq!(call.final_status.as_deref(), Some("confirmed_fraud"));
    assert_eq!(call.confirmation_attempts, 1);

    let types: Vec<_> = desk
        .log
        .events_for_call(&call.call_id)?
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&"status_updated".to_string()));
    assert_eq!(types.last().map(String::as_str), Some("call_aborted"));
    Ok(())
}

/// Events carry the time they happened, not the time they were stored.
#[test]
fn event_times_follow_the_call() -> DeskResult<()> {
    let desk = build();
    let mut channel = DroppingChannel::new(&["Alice", "1234", "yes"], usize::MAX);
    channel.pause = Duration::from_millis(20);
    let outcome = desk.run_call(&mut channel)?;
    assert_eq!(outcome.event_times.len(), outcome.events.len());

    let record = desk.log.call(&outcome.call_id)?.expect("call row");
    let parse = |t: &str| chrono::DateTime::parse_from_rfc3339(t).expect("rfc 3339");
    let started = parse(&record.started_at);
    let ended = parse(record.ended_at.as_deref().expect("ended"));

    let times: Vec<_> = desk
        .log
        .events_for_call(&outcome.call_id)?
        .iter()
        .map(|e| parse(&e.created_at))
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert!(started <= times[0]);
    assert!(times[times.len() - 1] <= ended);
    // Three answers, each 20 ms apart, separate the first event from the last.
    assert!(times[times.len() - 1] - times[0] >= chrono::Duration::milliseconds(60));
    Ok(())
}

#[test]
fn customer_history_spans_calls() -> DeskResult<()> {
    let desk = build();
    desk.run_call(&mut ScriptedChannel::from_lines(["Alice", "0000"]))?;
    desk.run_call(&mut ScriptedChannel::from_lines(["ALICE", "1234", "yes"]))?;
    desk.run_call(&mut ScriptedChannel::from_lines(["Alice", "1234", "no"]))?;
    desk.run_call(&mut ScriptedChannel::from_lines(["John", "12345", "yes"]))?;

    let history = desk.log.calls_for_customer("Alice")?;
    let reasons: Vec<_> = history.iter().filter_map(|c| c.reason.clone()).collect();
    assert_eq!(history.len(), 3);
    assert!(reasons.contains(&"verification_failed".to_string()));
    assert!(reasons.contains(&"completed".to_string()));
    assert!(reasons.contains(&"already_resolved".to_string()));

    assert_eq!(desk.store().find_case("Alice")?.status, CaseStatus::ConfirmedSafe);
    assert_eq!(desk.store().find_case("John")?.status, CaseStatus::ConfirmedSafe);
    Ok(())
}

/// A case file and call log on disk, reopened by a second desk.
#[test]
fn file_backed_desk_survives_restart() -> DeskResult<()> {
    let dir = tempfile::tempdir().map_err(|e| anyhow::anyhow!(e))?;
    let cases_path = dir.path().join("fraud_db.json");
    let log_path = dir.path().join("calls.db");
    JsonCaseStore::create(&cases_path, &cases())?;

    let cases_path = cases_path.to_string_lossy().to_string();
    let log_path = log_path.to_string_lossy().to_string();

    let first_call = {
        let desk = FraudDesk::open(&cases_path, DeskConfig::default_test(), &log_path)?;
        desk.run_call(&mut ScriptedChannel::from_lines(["John", "12345", "nope"]))?
    };
    assert_eq!(first_call.final_status, Some(CaseStatus::ConfirmedFraud));

    let store = JsonCaseStore::open(&cases_path)?;
    assert_eq!(store.find_case("John")?.status, CaseStatus::ConfirmedFraud);

    let desk = FraudDesk::open(&cases_path, DeskConfig::default_test(), &log_path)?;
    let outcome = desk.run_call(&mut ScriptedChannel::from_lines(["John", "12345", "yes"]))?;
    assert_eq!(outcome.reason, TerminationReason::AlreadyResolved);
    assert_eq!(desk.store().find_case("John")?.status, CaseStatus::ConfirmedFraud);

    let log = CallLog::open(&log_path)?;
    assert_eq!(log.call_count()?, 2);
    assert!(log.call(&first_call.call_id)?.is_some());
    Ok(())
}
