//! The fraud case record and its status.
//!
//! RULE: Only `status` is ever written after a case is created.
//! Every other field is display data seeded out-of-band.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One flagged transaction awaiting customer confirmation.
///
/// Older case files written by the first version of the desk use camelCase
/// names (`userName`, `cardEnding`, ...). They are accepted on read; writes
/// always use the names below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudCase {
    #[serde(alias = "userName")]
    pub customer_name: String,
    #[serde(alias = "securityIdentifier")]
    pub security_identifier: String,
    #[serde(alias = "transactionAmount", deserialize_with = "amount::deserialize")]
    pub transaction_amount: f64,
    #[serde(alias = "transactionName")]
    pub merchant: String,
    #[serde(alias = "transactionTime")]
    pub transaction_time: String,
    #[serde(alias = "transactionSource")]
    pub source: String,
    #[serde(alias = "cardEnding")]
    pub card_last4: String,
    #[serde(default, alias = "case_status")]
    pub status: CaseStatus,
    /// Fields this version does not know about (e.g. `notes`).
    /// Carried through reads and writes untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FraudCase {
    /// Case-insensitive exact match on the customer name.
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.customer_name) == normalize_name(name)
    }
}

/// Lookup key form of a customer name: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    #[serde(alias = "pending_review")]
    Pending,
    ConfirmedSafe,
    ConfirmedFraud,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending        => "pending",
            Self::ConfirmedSafe  => "confirmed_safe",
            Self::ConfirmedFraud => "confirmed_fraud",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod amount {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    /// Accepts `500`, `500.0` or a display string such as `"$1,250.00"`.
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
        match Raw::deserialize(de)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                    .collect();
                cleaned
                    .parse()
                    .map_err(|_| D::Error::custom(format!("invalid transaction amount '{s}'")))
            }
        }
    }
}
