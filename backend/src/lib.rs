//! # Cashbox Backend
//!
//! Petty-cash register service for a small arts institute. The core is the
//! cash-register reconciliation workflow: open a session with a float,
//! record income and expenses against the ledger, tally the drawer by
//! denomination, close the day with the count and notes, and reconcile any
//! variance with a signed adjustment entry.
//!
//! Storage is file-based (YAML metadata plus CSV ledgers per register); the
//! REST layer in [`rest`] exposes the workflow to the admin front-end.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub mod domain;
pub mod rest;
pub mod storage;

pub use storage::csv::CsvConnection;

/// Main backend struct that orchestrates all services
pub struct Backend {
    pub register_service: domain::RegisterService,
    pub transaction_service: domain::TransactionService,
    pub balance_service: domain::BalanceService<CsvConnection>,
    pub session_service: domain::SessionService,
    pub reconcile_service: domain::ReconcileService,
    pub report_service: domain::ReportService,
}

impl Backend {
    /// Create a new backend instance rooted at the given data directory
    pub fn new<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let csv_conn = Arc::new(CsvConnection::new(data_directory)?);
        Self::with_connection(csv_conn)
    }

    /// Create a new backend instance in the default data directory
    pub fn new_default() -> Result<Self> {
        let csv_conn = Arc::new(CsvConnection::new_default()?);
        Self::with_connection(csv_conn)
    }

    fn with_connection(csv_conn: Arc<CsvConnection>) -> Result<Self> {
        let register_service = domain::RegisterService::new(csv_conn.clone());
        let balance_service = domain::BalanceService::new(csv_conn.clone());
        let transaction_service = domain::TransactionService::new(
            csv_conn.clone(),
            register_service.clone(),
            balance_service.clone(),
        );
        let session_service = domain::SessionService::new(
            csv_conn.clone(),
            register_service.clone(),
            transaction_service.clone(),
        );
        let reconcile_service = domain::ReconcileService::new(
            csv_conn.clone(),
            register_service.clone(),
            transaction_service.clone(),
        );
        let report_service = domain::ReportService::new();

        Ok(Backend {
            register_service,
            transaction_service,
            balance_service,
            session_service,
            reconcile_service,
            report_service,
        })
    }
}
