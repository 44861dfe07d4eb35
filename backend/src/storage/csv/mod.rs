//! # CSV Storage Module
//!
//! File-based storage implementation for the cash register service. Each
//! register gets its own directory under the data root with YAML metadata
//! plus CSV ledger and session files.
//!
//! ## File Layout
//!
//! ```text
//! data/
//! ├── global_config.yaml
//! └── {register_name}/
//!     ├── register.yaml
//!     ├── transactions.csv
//!     └── sessions.csv
//! ```

pub mod connection;
pub mod register_repository;
pub mod session_repository;
pub mod transaction_repository;

#[cfg(test)]
pub mod test_utils;

pub use connection::CsvConnection;
pub use register_repository::RegisterRepository;
pub use session_repository::SessionRepository;
pub use transaction_repository::TransactionRepository;
