use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction ID in format: "transaction::<income|expense|adjustment>::epoch_millis-suffix"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// ID of the register this entry belongs to
    pub register_id: String,
    /// Human-readable timestamp with timezone (RFC 3339)
    pub date: String,
    /// Description of the entry (max 256 characters)
    pub description: String,
    /// Entry amount (positive for income, negative for expense, signed for adjustments)
    pub amount: f64,
    /// Register balance after this entry
    pub balance: f64,
    /// Type of entry for rendering purposes
    pub entry_type: TransactionType,
}

/// Type of ledger entry for rendering and business logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money added to the register
    Income,
    /// Money taken out of the register
    Expense,
    /// Signed correction posted by the reconciliation workflow
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListRequest {
    /// Register to list; the active register is used if not provided
    pub register_id: Option<String>,
    /// Cursor for pagination - transaction ID to start after
    pub after: Option<String>,
    /// Maximum number of transactions to return
    pub limit: Option<u32>,
    /// Start date for filtering (RFC 3339)
    pub start_date: Option<String>,
    /// End date for filtering (RFC 3339)
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTransactionRequest {
    /// Register to record against; the active register is used if not provided
    pub register_id: Option<String>,
    /// Description of the entry (max 256 characters)
    pub description: String,
    /// Entry amount (positive for income, negative for expense)
    pub amount: f64,
    /// Optional date override (RFC 3339) - uses current time if not provided
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Request for deleting multiple transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTransactionsRequest {
    pub register_id: Option<String>,
    pub transaction_ids: Vec<String>,
}

/// Response after deleting transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTransactionsResponse {
    pub deleted_count: usize,
    pub success_message: String,
    pub not_found_ids: Vec<String>,
}

/// Represents a petty-cash register tracked for an institute location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub id: String,
    pub name: String,
    pub location: String,
    pub created_at: String, // RFC 3339 timestamp
    pub updated_at: String, // RFC 3339 timestamp
}

/// Request for creating a new register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRegisterRequest {
    pub name: String,
    pub location: String,
}

/// Request for updating an existing register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateRegisterRequest {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Response after creating or updating a register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterResponse {
    pub register: Register,
    pub success_message: String,
}

/// Response containing a list of registers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterListResponse {
    pub registers: Vec<Register>,
}

/// Request for setting the active register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetActiveRegisterRequest {
    pub register_id: String,
}

/// Response after setting the active register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetActiveRegisterResponse {
    pub success_message: String,
    pub active_register: Register,
}

/// Response containing the active register information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveRegisterResponse {
    pub active_register: Option<Register>,
}

/// One line of a denomination-based cash count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenominationLine {
    /// Face value of the bill or coin
    pub denomination: f64,
    /// Number of pieces counted
    pub quantity: u32,
}

/// Request to tally a drawer against the open session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashCountRequest {
    pub register_id: Option<String>,
    pub lines: Vec<DenominationLine>,
}

/// Outcome of comparing a counted drawer to the expected balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashCountResponse {
    pub expected_total: f64,
    pub counted_total: f64,
    pub difference: f64,
    pub balanced: bool,
}

/// One open-to-close span of a register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSession {
    pub id: String,
    pub register_id: String,
    pub opening_balance: f64,
    pub opened_by: String,
    pub opened_at: String, // RFC 3339 timestamp
    pub state: String,     // "open" | "closed" | "reconciled"
    pub counted_total: Option<f64>,
    pub expected_total: Option<f64>,
    pub difference: Option<f64>,
    pub notes: Option<String>,
    pub closed_by: Option<String>,
    pub closed_at: Option<String>,
}

/// Request to open a register session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    pub register_id: Option<String>,
    /// Declared cash float; defaults to the current ledger balance
    pub opening_balance: Option<f64>,
    pub opened_by: String,
}

/// Response containing a single session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session: RegisterSession,
    pub success_message: String,
}

/// Response for the current-session query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSessionResponse {
    pub session: Option<RegisterSession>,
    pub expected_total: Option<f64>,
}

/// Request to close the open session with a final cash count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSessionRequest {
    pub register_id: Option<String>,
    pub lines: Vec<DenominationLine>,
    pub notes: Option<String>,
    pub closed_by: String,
}

/// Response after closing a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSessionResponse {
    pub session: RegisterSession,
    pub outcome: CashCountResponse,
    pub success_message: String,
}

/// Request to reconcile a closed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSessionRequest {
    pub register_id: Option<String>,
    /// Session to reconcile; defaults to the most recent closed session
    pub session_id: Option<String>,
}

/// Response after reconciling a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSessionResponse {
    pub session: RegisterSession,
    /// The adjustment entry posted, if the session had a variance
    pub adjustment: Option<Transaction>,
    pub success_message: String,
}

/// Response containing session history (most recent first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<RegisterSession>,
}

/// Request for a period summary over the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Aggregated movement over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummaryResponse {
    pub register_name: String,
    pub income_total: f64,
    pub expense_total: f64,
    pub adjustment_total: f64,
    pub net_movement: f64,
    pub closing_balance: f64,
    pub transaction_count: usize,
}

/// Request to export the ledger as CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDataRequest {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Response containing generated CSV content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDataResponse {
    pub csv_content: String,
    pub filename: String,
    pub transaction_count: usize,
    pub register_name: String,
}

/// Request to export the ledger directly to a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportToPathRequest {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Target directory; defaults to the user's Documents folder
    pub custom_path: Option<String>,
}

/// Response after writing an export file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportToPathResponse {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub transaction_count: usize,
    pub register_name: String,
}

impl Transaction {
    /// Parse a transaction ID to extract its entry kind and timestamp
    pub fn parse_id(id: &str) -> Result<(String, u64), TransactionIdError> {
        let parts: Vec<&str> = id.split("::").collect();
        if parts.len() != 3 || parts[0] != "transaction" {
            return Err(TransactionIdError::InvalidFormat);
        }

        let entry_kind = parts[1];
        if entry_kind != "income" && entry_kind != "expense" && entry_kind != "adjustment" {
            return Err(TransactionIdError::InvalidType);
        }

        // The tail is "<epoch_millis>-<suffix>"; the suffix is optional for
        // entries imported from older exports.
        let epoch_millis = parts[2]
            .split('-')
            .next()
            .unwrap_or("")
            .parse::<u64>()
            .map_err(|_| TransactionIdError::InvalidTimestamp)?;

        Ok((entry_kind.to_string(), epoch_millis))
    }

    /// Extract epoch timestamp from a transaction ID for sorting
    pub fn extract_timestamp(&self) -> Result<u64, TransactionIdError> {
        Self::parse_id(&self.id).map(|(_, timestamp)| timestamp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionIdError {
    InvalidFormat,
    InvalidType,
    InvalidTimestamp,
}

impl fmt::Display for TransactionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionIdError::InvalidFormat => write!(f, "Invalid transaction ID format"),
            TransactionIdError::InvalidType => write!(f, "Invalid transaction type"),
            TransactionIdError::InvalidTimestamp => write!(f, "Invalid timestamp in transaction ID"),
        }
    }
}

impl std::error::Error for TransactionIdError {}

impl Register {
    /// Generate a register ID based on timestamp
    pub fn generate_id(epoch_millis: u64) -> String {
        format!("register::{}", epoch_millis)
    }

    /// Parse a register ID to extract the timestamp
    pub fn parse_id(id: &str) -> Result<u64, RegisterIdError> {
        let parts: Vec<&str> = id.split("::").collect();
        if parts.len() != 2 || parts[0] != "register" {
            return Err(RegisterIdError::InvalidFormat);
        }

        parts[1]
            .parse::<u64>()
            .map_err(|_| RegisterIdError::InvalidTimestamp)
    }

    /// Extract timestamp from a register ID
    pub fn extract_timestamp(&self) -> Result<u64, RegisterIdError> {
        Self::parse_id(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterIdError {
    InvalidFormat,
    InvalidTimestamp,
}

impl fmt::Display for RegisterIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterIdError::InvalidFormat => write!(f, "Invalid register ID format"),
            RegisterIdError::InvalidTimestamp => write!(f, "Invalid timestamp in register ID"),
        }
    }
}

impl std::error::Error for RegisterIdError {}
