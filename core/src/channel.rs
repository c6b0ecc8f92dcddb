//! The call channel port.
//!
//! One trait stands in for the whole media side of a call: the transport
//! that carries audio, speech-to-text on the way in and text-to-speech on
//! the way out. The dialogue controller only ever sees text.

use crate::error::TransportError;
use std::{collections::VecDeque, time::Duration};

/// What came back from one listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// A transcribed utterance. May still be empty or unintelligible.
    Utterance(String),
    /// The per-prompt timeout expired with nothing transcribed.
    Silence,
}

impl Heard {
    pub fn utterance(text: impl Into<String>) -> Self {
        Self::Utterance(text.into())
    }

    /// The transcript, or `None` when nothing usable was heard.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Utterance(t) if !t.trim().is_empty() => Some(t.trim()),
            _ => None,
        }
    }
}

pub trait CallChannel {
    /// Play one line to the caller.
    fn speak(&mut self, text: &str) -> Result<(), TransportError>;

    /// Block until the caller says something or `timeout` expires.
    fn listen(&mut self, timeout: Duration) -> Result<Heard, TransportError>;

    /// End the call from our side.
    fn hang_up(&mut self) -> Result<(), TransportError>;
}

/// Replays a fixed list of caller turns and records what was said to it.
///
/// Running out of turns behaves like the caller hanging up.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    turns:     VecDeque<Heard>,
    spoken:    Vec<String>,
    hung_up:   bool,
    listens:   usize,
}

impl ScriptedChannel {
    pub fn new(turns: impl IntoIterator<Item = Heard>) -> Self {
        Self {
            turns: turns.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Convenience: each string is an utterance, `""` is silence.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(lines.into_iter().map(|l| {
            let l = l.as_ref();
            if l.trim().is_empty() {
                Heard::Silence
            } else {
                Heard::utterance(l)
            }
        }))
    }

    pub fn spoken(&self) -> &[String] {
        &self.spoken
    }

    pub fn hung_up(&self) -> bool {
        self.hung_up
    }

    pub fn listens(&self) -> usize {
        self.listens
    }

    pub fn remaining(&self) -> usize {
        self.turns.len()
    }
}

impl CallChannel for ScriptedChannel {
    fn speak(&mut self, text: &str) -> Result<(), TransportError> {
        if self.hung_up {
            return Err(TransportError::HungUp);
        }
        self.spoken.push(text.to_string());
        Ok(())
    }

    fn listen(&mut self, _timeout: Duration) -> Result<Heard, TransportError> {
        if self.hung_up {
            return Err(TransportError::HungUp);
        }
        self.listens += 1;
        self.turns.pop_front().ok_or(TransportError::HungUp)
    }

    fn hang_up(&mut self) -> Result<(), TransportError> {
        self.hung_up = true;
        Ok(())
    }
}
