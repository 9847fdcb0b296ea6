use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: String,
    #[serde(default)]
    pub note: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Parsed amount, `None` when the stored string is not a finite number.
    pub fn amount_value(&self) -> Option<f64> {
        self.amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "income" | "in" => Ok(Self::Income),
            "expense" | "out" => Ok(Self::Expense),
            other => Err(AppError::invalid_input(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub amount: String,
    pub note: String,
    pub kind: TransactionKind,
}

impl TransactionDraft {
    pub fn new<A: Into<String>>(amount: A, kind: TransactionKind) -> Self {
        Self {
            amount: amount.into(),
            note: String::new(),
            kind,
        }
    }

    pub fn with_note<N: Into<String>>(mut self, note: N) -> Self {
        self.note = note.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub amount: Option<String>,
    pub note: Option<String>,
    pub kind: Option<TransactionKind>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.note.is_none() && self.kind.is_none()
    }

    pub(crate) fn apply(self, transaction: &mut Transaction) {
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(note) = self.note {
            transaction.note = note;
        }
        if let Some(kind) = self.kind {
            transaction.kind = kind;
        }
    }
}
