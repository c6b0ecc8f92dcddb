//! Everything the assistant says, in one place.
//!
//! RULE: No line asks for a PIN, password, CVV or full card number.
//! The security identifier is the only secret the desk ever requests.

use crate::{case::FraudCase, dialogue::TerminationReason};

#[derive(Debug, Clone)]
pub struct CallScript {
    pub agent_name: String,
    pub bank_name:  String,
}

impl CallScript {
    pub fn new(agent_name: impl Into<String>, bank_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            bank_name:  bank_name.into(),
        }
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hello, this is {} from the Fraud Department at {}. May I have your first name?",
            self.agent_name, self.bank_name
        )
    }

    pub fn ask_name_again(&self) -> String {
        "Sorry, I didn't catch that. Could you tell me your first name?".to_string()
    }

    pub fn ask_identifier(&self, name: &str) -> String {
        format!(
            "Thank you, {}. To verify your identity, please tell me your security identifier.",
            name.trim()
        )
    }

    pub fn ask_identifier_again(&self) -> String {
        "Sorry, I didn't catch that. Please tell me your security identifier.".to_string()
    }

    /// Only ever spoken after the identifier matched.
    pub fn read_transaction(&self, case: &FraudCase) -> String {
        format!(
            "We flagged a transaction of {} at {} from {} around {}, on your card ending in {}.",
            format_amount(case.transaction_amount),
            case.merchant,
            case.source,
            case.transaction_time,
            case.card_last4,
        )
    }

    pub fn ask_confirmation(&self) -> String {
        "Did you make this transaction?".to_string()
    }

    pub fn reprompt_confirmation(&self) -> String {
        "Sorry, I need a clear yes or no. Did you make this transaction?".to_string()
    }

    pub fn confirmed_safe(&self) -> String {
        "Thank you. I've marked this transaction as legitimate, and your account is secure."
            .to_string()
    }

    pub fn confirmed_fraud(&self, case: &FraudCase) -> String {
        format!(
            "Thank you for letting us know. Your card ending in {} has been blocked \
             and a new one will be issued.",
            case.card_last4
        )
    }

    pub fn closing(&self, reason: TerminationReason) -> String {
        match reason {
            TerminationReason::Completed => format!(
                "Thank you for your time, and for banking with {}. Goodbye.",
                self.bank_name
            ),
            TerminationReason::UnknownCustomer => {
                "I'm sorry, I couldn't find a case under that name. Please call the number \
                 on the back of your card. Goodbye."
                    .to_string()
            }
            TerminationReason::VerificationFailed => {
                "I'm sorry, I wasn't able to verify your identity, so I can't continue this \
                 call. Please call the number on the back of your card. Goodbye."
                    .to_string()
            }
            TerminationReason::Unresolved => {
                "I wasn't able to get a clear answer, so I'll leave this case open and a \
                 specialist will follow up with you. Goodbye."
                    .to_string()
            }
            TerminationReason::AlreadyResolved => {
                "This case has already been reviewed and no further action is needed. Goodbye."
                    .to_string()
            }
            TerminationReason::StoreFailure => {
                "I'm sorry, we're having a system problem and I can't complete this call. A \
                 specialist will follow up with you. Goodbye."
                    .to_string()
            }
        }
    }
}

impl Default for CallScript {
    fn default() -> Self {
        Self::new("Alex", "Global Bank")
    }
}

/// `1250.5` -> `"$1,250.50"`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
