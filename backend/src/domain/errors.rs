//! Typed violations of the cash-register workflow.

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Expense of {requested:.2} exceeds the available balance of {available:.2}")]
    InsufficientFunds { requested: f64, available: f64 },
    #[error("Description must be between 1 and 256 characters")]
    InvalidDescription,
    #[error("Denomination must be positive, got {0:.2}")]
    InvalidDenomination(f64),
    #[error("Register has no open session")]
    SessionNotOpen,
    #[error("Register already has an open session")]
    SessionAlreadyOpen,
    #[error("Session {0} is not awaiting reconciliation")]
    NotAwaitingReconciliation(String),
}
