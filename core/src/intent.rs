//! Yes/no intent classification for the confirmation prompt.
//!
//! Free-form text in, one of three outcomes out. Anything that is not
//! clearly affirmative or clearly negative is `Unrecognized`, including
//! answers that contain both ("yes... no wait").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Affirmative,
    Negative,
    Unrecognized,
}

/// Seam for whatever supplies the classification. The desk ships with
/// `PhraseTable`; a language-model backed classifier plugs in here.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, utterance: &str) -> Confirmation;
}

pub const DEFAULT_AFFIRMATIVE: &[&str] = &[
    "yes", "yeah", "yep", "yup", "correct", "that's right", "that was me",
    "it was me", "i did", "i made it", "sure", "absolutely", "affirmative",
];

pub const DEFAULT_NEGATIVE: &[&str] = &[
    "no", "nope", "nah", "not me", "i didn't", "i did not", "that wasn't me",
    "it wasn't me", "never", "negative", "fraud",
];

/// Accepted phrases mapped to their outcome.
#[derive(Debug, Clone)]
pub struct PhraseTable {
    affirmative: Vec<Vec<String>>,
    negative:    Vec<Vec<String>>,
}

impl PhraseTable {
    pub fn new<A, N>(affirmative: A, negative: N) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            affirmative: compile(affirmative),
            negative:    compile(negative),
        }
    }

    pub fn classify(&self, utterance: &str) -> Confirmation {
        let words = tokenize(utterance);
        if words.is_empty() {
            return Confirmation::Unrecognized;
        }

        // "i did" is a prefix of "i did not": a negative phrase that
        // covers an affirmative match wins instead of making it ambiguous.
        let neg_spans = spans(&self.negative, &words);
        let yes = spans(&self.affirmative, &words)
            .into_iter()
            .any(|(s, e)| !neg_spans.iter().any(|&(ns, ne)| ns <= s && e <= ne));
        let no = !neg_spans.is_empty();

        match (yes, no) {
            (true, false) => Confirmation::Affirmative,
            (false, true) => Confirmation::Negative,
            _ => Confirmation::Unrecognized,
        }
    }
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self::new(DEFAULT_AFFIRMATIVE, DEFAULT_NEGATIVE)
    }
}

impl IntentClassifier for PhraseTable {
    fn classify(&self, utterance: &str) -> Confirmation {
        PhraseTable::classify(self, utterance)
    }
}

/// Classify with the default phrase table.
pub fn classify_confirmation(utterance: &str) -> Confirmation {
    PhraseTable::default().classify(utterance)
}

fn compile<I>(phrases: I) -> Vec<Vec<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    phrases
        .into_iter()
        .map(|p| tokenize(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Lowercase, drop punctuation (apostrophes kept), split on whitespace.
/// Curly apostrophes from transcripts are folded to ASCII.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            c if c.is_alphanumeric() || c == '\'' => c,
            _ => ' ',
        })
        .collect::<String>()
        .split_whitespace()
        .map(|w| w.trim_matches('\'').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Word ranges `[start, end)` where any phrase occurs as whole words.
fn spans(phrases: &[Vec<String>], words: &[String]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for phrase in phrases {
        if phrase.len() > words.len() {
            continue;
        }
        for start in 0..=words.len() - phrase.len() {
            if words[start..start + phrase.len()] == phrase[..] {
                out.push((start, start + phrase.len()));
            }
        }
    }
    out
}
