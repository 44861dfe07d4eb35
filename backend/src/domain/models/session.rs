use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionState {
    Open,
    Closed,
    Reconciled,
}

impl SessionState {
    /// Convert to string for CSV storage
    pub fn to_string(&self) -> String {
        match self {
            SessionState::Open => "open".to_string(),
            SessionState::Closed => "closed".to_string(),
            SessionState::Reconciled => "reconciled".to_string(),
        }
    }

    /// Parse from string for CSV loading
    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "open" => Ok(SessionState::Open),
            "closed" => Ok(SessionState::Closed),
            "reconciled" => Ok(SessionState::Reconciled),
            _ => Err(format!("Invalid session state: {}", s)),
        }
    }
}

/// One open-to-close span of a register, typically a working day.
///
/// Sessions are append-only history: the count fields stay empty while the
/// session is open and are filled in by the closing workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterSession {
    pub id: String,
    pub register_id: String,
    pub opening_balance: f64,
    pub opened_by: String,
    pub opened_at: String,
    pub state: SessionState,
    pub counted_total: Option<f64>,
    pub expected_total: Option<f64>,
    pub difference: Option<f64>,
    pub notes: Option<String>,
    pub closed_by: Option<String>,
    pub closed_at: Option<String>,
}

impl RegisterSession {
    pub fn generate_id(register_id: &str, now_millis: u64) -> String {
        format!("session::{}_{}", register_id, now_millis)
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}
