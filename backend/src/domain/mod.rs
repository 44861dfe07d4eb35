//! Domain layer for the cash register service.
//!
//! Services follow a command-in/result-out shape over the storage traits;
//! the REST layer maps them onto the wire DTOs in the `shared` crate.

pub mod commands;
pub mod errors;
pub mod models;

pub mod balance_service;
pub mod reconcile_service;
pub mod register_service;
pub mod report_service;
pub mod session_service;
pub mod transaction_service;

pub use balance_service::BalanceService;
pub use reconcile_service::ReconcileService;
pub use register_service::RegisterService;
pub use report_service::ReportService;
pub use session_service::SessionService;
pub use transaction_service::TransactionService;
