//! Domain model for a ledger entry.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionType {
    Income,
    Expense,
    Adjustment,
}

impl TransactionType {
    /// Convert to the string used in IDs and CSV storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Adjustment => "adjustment",
        }
    }

    /// Parse from the string used in CSV storage
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "adjustment" => Ok(TransactionType::Adjustment),
            _ => Err(format!("Invalid entry type: {}", s)),
        }
    }

    /// Infer the entry type of a plain income/expense entry from its sign
    pub fn from_amount(amount: f64) -> Self {
        if amount >= 0.0 {
            TransactionType::Income
        } else {
            TransactionType::Expense
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub register_id: String,
    pub date: DateTime<FixedOffset>,
    pub description: String,
    pub amount: f64,
    /// Register balance after this entry
    pub balance: f64,
    pub entry_type: TransactionType,
}

impl Transaction {
    /// Generate a unique transaction ID from the entry type and a timestamp.
    /// Format: transaction::<kind>::<timestamp_ms>-<random_suffix>
    /// Example: transaction::income::1625846400123-af3c
    pub fn generate_id(entry_type: &TransactionType, timestamp_ms: u64) -> String {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(4)
            .collect();
        format!("transaction::{}::{}-{}", entry_type.as_str(), timestamp_ms, suffix)
    }
}
