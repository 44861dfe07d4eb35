//! Commands and results for the transaction recorder.

use chrono::{DateTime, FixedOffset};

use crate::domain::models::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct RecordTransactionCommand {
    /// Register to record against; the active register is used if None
    pub register_id: Option<String>,
    pub description: String,
    /// Positive for income, negative for expense
    pub amount: f64,
    /// Uses the current time if not provided
    pub date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone)]
pub struct TransactionListQuery {
    pub register_id: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaginationInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransactionListResult {
    pub transactions: Vec<Transaction>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone)]
pub struct DeleteTransactionsCommand {
    pub register_id: Option<String>,
    pub transaction_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeleteTransactionsResult {
    pub deleted_count: usize,
    pub success_message: String,
    pub not_found_ids: Vec<String>,
}
