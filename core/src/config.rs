use crate::{intent::PhraseTable, script::CallScript};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the heard identifier is compared with the stored one.
///
/// Both sides are trimmed and internal whitespace is dropped first, since
/// transcribers render "1234" as "12 34" or "1 2 3 4".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

impl IdentifierMatch {
    pub fn matches(&self, expected: &str, heard: &str) -> bool {
        let expected = squash(expected);
        let heard = squash(heard);
        if expected.is_empty() {
            return false;
        }
        match self {
            Self::Exact           => expected == heard,
            Self::CaseInsensitive => expected.to_lowercase() == heard.to_lowercase(),
        }
    }
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Desk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub agent_name: String,
    pub bank_name: String,
    /// Tries for the name and identifier prompts when nothing usable is heard.
    pub max_input_attempts: u32,
    /// Total tries for the yes/no prompt, first ask included.
    pub max_confirmation_attempts: u32,
    pub response_timeout_secs: u64,
    pub identifier_match: IdentifierMatch,
    pub affirmative_phrases: Vec<String>,
    pub negative_phrases: Vec<String>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            agent_name: "Alex".into(),
            bank_name: "Global Bank".into(),
            max_input_attempts: 3,
            max_confirmation_attempts: 3,
            response_timeout_secs: 8,
            identifier_match: IdentifierMatch::Exact,
            affirmative_phrases: crate::intent::DEFAULT_AFFIRMATIVE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            negative_phrases: crate::intent::DEFAULT_NEGATIVE
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DeskConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_input_attempts == 0 {
            anyhow::bail!("max_input_attempts must be at least 1");
        }
        if self.max_confirmation_attempts == 0 {
            anyhow::bail!("max_confirmation_attempts must be at least 1");
        }
        if self.response_timeout_secs == 0 {
            anyhow::bail!("response_timeout_secs must be at least 1");
        }
        if self.affirmative_phrases.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("affirmative_phrases must not be empty");
        }
        if self.negative_phrases.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("negative_phrases must not be empty");
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn phrase_table(&self) -> PhraseTable {
        PhraseTable::new(&self.affirmative_phrases, &self.negative_phrases)
    }

    pub fn script(&self) -> CallScript {
        CallScript::new(self.agent_name.clone(), self.bank_name.clone())
    }

    /// Config with hardcoded defaults and a short timeout, for tests.
    pub fn default_test() -> Self {
        Self {
            response_timeout_secs: 1,
            ..Self::default()
        }
    }
}
