//! call-runner: headless runner for the fraud desk.
//!
//! Usage:
//!   call-runner --cases data/fraud_db.json                  (console call)
//!   call-runner --cases data/fraud_db.json --script call.txt
//!   call-runner --cases data/fraud_db.json --ipc-mode --log calls.db
//!   call-runner --cases data/fraud_db.json --list
//!   call-runner --cases data/fraud_db.json --show Alice --log calls.db

use anyhow::Result;
use fraud_desk_core::{
    channel::{CallChannel, Heard, ScriptedChannel},
    config::DeskConfig,
    desk::FraudDesk,
    dialogue::CallOutcome,
    error::{DeskError, TransportError},
    script::format_amount,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcInput {
    Utterance { text: String },
    Silence,
    HangUp,
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcOutput<'a> {
    Speak { text: &'a str },
    Listening { timeout_secs: u64 },
    CallEnded { outcome: &'a CallOutcome },
    CallAborted { error: String },
    Error { message: String },
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cases = flag_value(&args, "--cases").unwrap_or("data/fraud_db.json");
    let log_path = flag_value(&args, "--log").unwrap_or(":memory:");
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let config = match flag_value(&args, "--config") {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::default(),
    };

    let desk = FraudDesk::open(cases, config, log_path)?;

    if args.iter().any(|a| a == "--list") {
        return list_cases(&desk);
    }
    if let Some(name) = flag_value(&args, "--show") {
        return show_case(&desk, name);
    }

    let result = if ipc_mode {
        let mut channel = IpcChannel::new();
        let result = desk.run_call(&mut channel);
        report_ipc(&mut channel, &result)?;
        result.map(|_| ())
    } else if let Some(path) = flag_value(&args, "--script") {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut channel = ScriptedChannel::from_lines(content.lines());
        let result = desk.run_call(&mut channel);
        for line in channel.spoken() {
            println!("AGENT:  {line}");
        }
        print_result(&result);
        result.map(|_| ())
    } else {
        println!("Fraud desk console. Type the caller's answers; an empty line is silence.");
        println!();
        let mut channel = ConsoleChannel;
        let result = desk.run_call(&mut channel);
        print_result(&result);
        result.map(|_| ())
    };

    match result {
        // The caller hanging up is an ordinary way for a call to end.
        Err(DeskError::Transport(TransportError::HungUp)) => Ok(()),
        other => other.map_err(Into::into),
    }
}

// ── Channels ───────────────────────────────────────────────────

/// Caller on stdin, agent on stdout.
/// stdin has no timeout: an empty line stands in for silence.
struct ConsoleChannel;

impl CallChannel for ConsoleChannel {
    fn speak(&mut self, text: &str) -> Result<(), TransportError> {
        println!("AGENT:  {text}");
        Ok(())
    }

    fn listen(&mut self, _timeout: Duration) -> Result<Heard, TransportError> {
        print!("CALLER> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(TransportError::HungUp);
        }
        Ok(if line.trim().is_empty() {
            Heard::Silence
        } else {
            Heard::utterance(line.trim())
        })
    }

    fn hang_up(&mut self) -> Result<(), TransportError> {
        println!("-- call ended --");
        Ok(())
    }
}

/// JSON lines on stdin/stdout, for a media bridge sitting in front of
/// speech-to-text and text-to-speech.
struct IpcChannel {
    stdout: io::Stdout,
}

impl IpcChannel {
    fn new() -> Self {
        Self { stdout: io::stdout() }
    }

    fn send(&mut self, msg: &IpcOutput<'_>) -> Result<(), TransportError> {
        let line = serde_json::to_string(msg)
            .map_err(|e| TransportError::Media(e.to_string()))?;
        writeln!(self.stdout, "{line}")?;
        self.stdout.flush()?;
        Ok(())
    }
}

impl CallChannel for IpcChannel {
    fn speak(&mut self, text: &str) -> Result<(), TransportError> {
        self.send(&IpcOutput::Speak { text })
    }

    fn listen(&mut self, timeout: Duration) -> Result<Heard, TransportError> {
        self.send(&IpcOutput::Listening { timeout_secs: timeout.as_secs() })?;

        let mut buffer = String::new();
        if io::stdin().lock().read_line(&mut buffer)? == 0 {
            return Err(TransportError::HungUp); // EOF
        }

        match serde_json::from_str::<IpcInput>(&buffer) {
            Ok(IpcInput::Utterance { text }) => Ok(Heard::Utterance(text)),
            Ok(IpcInput::Silence) => Ok(Heard::Silence),
            Ok(IpcInput::HangUp) => Err(TransportError::HungUp),
            Err(e) => {
                // Unparseable input counts as nothing heard.
                log::warn!("ipc: bad input line: {e}");
                self.send(&IpcOutput::Error { message: e.to_string() })?;
                Ok(Heard::Silence)
            }
        }
    }

    fn hang_up(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

// ── Reporting ──────────────────────────────────────────────────

fn report_ipc(
    channel: &mut IpcChannel,
    result: &Result<CallOutcome, DeskError>,
) -> Result<()> {
    let msg = match result {
        Ok(outcome) => IpcOutput::CallEnded { outcome },
        Err(e) => IpcOutput::CallAborted { error: e.to_string() },
    };
    // stdout may be gone together with the bridge; nothing left to tell it.
    if let Err(e) = channel.send(&msg) {
        log::warn!("ipc: could not report call end: {e}");
    }
    Ok(())
}

fn print_result(result: &Result<CallOutcome, DeskError>) {
    println!();
    match result {
        Ok(outcome) => {
            println!("=== CALL SUMMARY ===");
            println!("  call_id:   {}", outcome.call_id);
            println!("  customer:  {}", outcome.customer_name.as_deref().unwrap_or("-"));
            println!("  outcome:   {}", outcome.reason);
            println!(
                "  status:    {}",
                outcome.final_status.map(|s| s.as_str()).unwrap_or("-")
            );
            println!("  attempts:  {}", outcome.confirmation_attempts);
        }
        Err(e) => println!("=== CALL ABORTED: {e} ==="),
    }
}

fn list_cases(desk: &FraudDesk) -> Result<()> {
    let cases = desk.store().cases()?;
    println!("=== FRAUD CASES ({}) ===", cases.len());
    for c in cases {
        println!(
            "  {:<16} {:<16} {:>12}  {:<24} card {}",
            c.customer_name,
            c.status,
            format_amount(c.transaction_amount),
            c.merchant,
            c.card_last4
        );
    }
    Ok(())
}

fn show_case(desk: &FraudDesk, name: &str) -> Result<()> {
    let case = desk.store().find_case(name)?;
    println!("=== CASE: {} ===", case.customer_name);
    println!("  status:      {}", case.status);
    println!("  amount:      {}", format_amount(case.transaction_amount));
    println!("  merchant:    {}", case.merchant);
    println!("  time:        {}", case.transaction_time);
    println!("  source:      {}", case.source);
    println!("  card ending: {}", case.card_last4);

    let calls = desk.log.calls_for_customer(&case.customer_name)?;
    println!();
    println!("=== CALLS ({}) ===", calls.len());
    for call in calls {
        println!(
            "  {} | {} | {} | {}",
            call.started_at,
            call.call_id,
            call.reason.as_deref().unwrap_or("in progress"),
            call.final_status.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_output_lines() {
        let listening = serde_json::to_value(IpcOutput::Listening { timeout_secs: 8 }).unwrap();
        assert_eq!(listening, serde_json::json!({ "type": "listening", "timeout_secs": 8 }));

        let aborted = serde_json::to_value(IpcOutput::CallAborted {
            error: "Caller hung up".to_string(),
        })
        .unwrap();
        assert_eq!(aborted, serde_json::json!({ "type": "call_aborted", "error": "Caller hung up" }));
    }

    #[test]
    fn ipc_input_lines() {
        let heard: IpcInput = serde_json::from_str(r#"{"type":"utterance","text":"yes"}"#).unwrap();
        assert!(matches!(heard, IpcInput::Utterance { text } if text == "yes"));
        assert!(matches!(
            serde_json::from_str::<IpcInput>(r#"{"type":"hang_up"}"#).unwrap(),
            IpcInput::HangUp
        ));
    }
}
