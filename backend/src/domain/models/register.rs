use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain model representing a petty-cash register for an institute location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub id: String,
    pub name: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Register {
    /// Generate a unique ID for a register
    pub fn generate_id(timestamp_millis: u64) -> String {
        format!("register::{}", timestamp_millis)
    }
}

/// Represents the active register, which could be None if none is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRegister {
    pub register: Option<Register>,
}
