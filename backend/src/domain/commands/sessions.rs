//! Commands and results for the session workflow
//! (open → transact → count → close → reconcile).

use crate::domain::models::cash_count::{CountOutcome, DenominationLine};
use crate::domain::models::session::RegisterSession;
use crate::domain::models::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct OpenSessionCommand {
    pub register_id: Option<String>,
    /// Declared cash float; defaults to the current ledger balance
    pub opening_balance: Option<f64>,
    pub opened_by: String,
}

#[derive(Debug, Clone)]
pub struct OpenSessionResult {
    pub session: RegisterSession,
    pub success_message: String,
}

#[derive(Debug, Clone)]
pub struct GetCurrentSessionCommand {
    pub register_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetCurrentSessionResult {
    pub session: Option<RegisterSession>,
    /// What the drawer should hold right now, if a session is open
    pub expected_total: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CountCashCommand {
    pub register_id: Option<String>,
    pub lines: Vec<DenominationLine>,
}

#[derive(Debug, Clone)]
pub struct CountCashResult {
    pub outcome: CountOutcome,
}

#[derive(Debug, Clone)]
pub struct CloseSessionCommand {
    pub register_id: Option<String>,
    pub lines: Vec<DenominationLine>,
    pub notes: Option<String>,
    pub closed_by: String,
}

#[derive(Debug, Clone)]
pub struct CloseSessionResult {
    pub session: RegisterSession,
    pub outcome: CountOutcome,
    pub success_message: String,
}

#[derive(Debug, Clone)]
pub struct ReconcileSessionCommand {
    pub register_id: Option<String>,
    /// Session to reconcile; defaults to the most recent closed session
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReconcileSessionResult {
    pub session: RegisterSession,
    /// The adjustment entry posted, if the session had a variance
    pub adjustment: Option<Transaction>,
    pub success_message: String,
}

#[derive(Debug, Clone)]
pub struct SessionHistoryQuery {
    pub register_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SessionHistoryResult {
    pub sessions: Vec<RegisterSession>,
}
