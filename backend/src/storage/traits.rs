//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer.

use anyhow::Result;

use crate::domain::models::register::Register as DomainRegister;
use crate::domain::models::session::RegisterSession;
use crate::domain::models::transaction::Transaction as DomainTransaction;

/// Trait defining the interface for transaction storage operations
///
/// This trait abstracts away the specific storage implementation details,
/// allowing the domain layer to work with different storage backends
/// (SQL databases, CSV files, etc.) without modification.
pub trait TransactionStorage: Send + Sync {
    /// Store a new transaction
    fn store_transaction(&self, transaction: &DomainTransaction) -> Result<()>;

    /// Retrieve a specific transaction by ID
    fn get_transaction(
        &self,
        register_id: &str,
        transaction_id: &str,
    ) -> Result<Option<DomainTransaction>>;

    /// List transactions with pagination support
    /// Returns transactions ordered by date descending (most recent first)
    fn list_transactions(
        &self,
        register_id: &str,
        limit: Option<u32>,
        after: Option<String>,
    ) -> Result<Vec<DomainTransaction>>;

    /// List transactions in chronological order with optional date filtering
    /// Returns transactions ordered by date ascending (oldest first)
    fn list_transactions_chronological(
        &self,
        register_id: &str,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<DomainTransaction>>;

    /// Delete multiple transactions
    /// Returns the number of transactions actually deleted
    fn delete_transactions(&self, register_id: &str, transaction_ids: &[String]) -> Result<u32>;

    /// Get the most recent transaction for a register (for calculating the next balance)
    fn get_latest_transaction(&self, register_id: &str) -> Result<Option<DomainTransaction>>;

    /// Get all transactions on or after a specific date for balance recalculation
    /// Returns transactions in chronological order (oldest first)
    fn get_transactions_since(&self, register_id: &str, date: &str) -> Result<Vec<DomainTransaction>>;

    /// Get the most recent transaction before a specific date
    /// This is useful for finding the starting balance when inserting backdated entries
    fn get_latest_transaction_before_date(
        &self,
        register_id: &str,
        date: &str,
    ) -> Result<Option<DomainTransaction>>;

    /// Update multiple transaction balances atomically
    /// Used for bulk balance recalculation after backdated entries
    fn update_transaction_balances(
        &self,
        register_id: &str,
        updates: &[(String, f64)],
    ) -> Result<()>;

    /// Check which of the given transaction IDs exist for a register
    fn check_transactions_exist(
        &self,
        register_id: &str,
        transaction_ids: &[String],
    ) -> Result<Vec<String>>;
}

/// Trait defining the interface for register storage operations
pub trait RegisterStorage: Send + Sync {
    /// Store a new register
    fn store_register(&self, register: &DomainRegister) -> Result<()>;

    /// Retrieve a specific register by ID
    fn get_register(&self, register_id: &str) -> Result<Option<DomainRegister>>;

    /// List all registers ordered by name
    fn list_registers(&self) -> Result<Vec<DomainRegister>>;

    /// Update an existing register
    fn update_register(&self, register: &DomainRegister) -> Result<()>;

    /// Delete a register by ID
    fn delete_register(&self, register_id: &str) -> Result<()>;

    /// Get the currently active register ID
    fn get_active_register(&self) -> Result<Option<String>>;

    /// Set the currently active register
    fn set_active_register(&self, register_id: &str) -> Result<()>;
}

/// Trait defining the interface for register-session storage operations
///
/// Sessions are append-only history with state tracking; only the most recent
/// session of a register may be open.
pub trait SessionStorage: Send + Sync {
    /// Store a new session (append-only)
    fn store_session(&self, session: &RegisterSession) -> Result<()>;

    /// Get the currently open session for a register
    fn get_open_session(&self, register_id: &str) -> Result<Option<RegisterSession>>;

    /// Retrieve a specific session by ID
    fn get_session(&self, register_id: &str, session_id: &str) -> Result<Option<RegisterSession>>;

    /// List sessions for a register ordered by opened_at descending
    fn list_sessions(&self, register_id: &str, limit: Option<u32>) -> Result<Vec<RegisterSession>>;

    /// Update an existing session in place (state transitions, closing fields)
    fn update_session(&self, session: &RegisterSession) -> Result<()>;

    /// Check if a register has an open session
    fn has_open_session(&self, register_id: &str) -> Result<bool>;

    /// Get the most recently closed, not yet reconciled session
    fn get_latest_closed_session(&self, register_id: &str) -> Result<Option<RegisterSession>>;
}

/// Trait defining the interface for storage connections
///
/// This trait abstracts away the specific connection type (database, CSV, etc.)
/// and provides factory methods for creating repositories. This allows the domain
/// layer to work with any storage backend without knowing the implementation details.
pub trait Connection: Send + Sync + Clone {
    /// The type of TransactionStorage this connection creates
    type TransactionRepository: TransactionStorage + Clone;

    /// Create a new transaction repository for this connection
    fn create_transaction_repository(&self) -> Self::TransactionRepository;
}
