//! Shared helpers for storage-layer tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use super::connection::CsvConnection;
use super::register_repository::RegisterRepository;
use crate::domain::models::register::Register as DomainRegister;
use crate::storage::traits::RegisterStorage;

static NEXT_REGISTER_ID: AtomicU64 = AtomicU64::new(1);

/// Create a connection backed by a fresh temporary directory.
/// The TempDir must be kept alive for the duration of the test.
pub fn setup_connection() -> (CsvConnection, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let connection = CsvConnection::new(temp_dir.path()).expect("Failed to create connection");
    (connection, temp_dir)
}

/// Store a register with a unique ID and return it.
pub fn seed_register(connection: &CsvConnection, name: &str) -> DomainRegister {
    let repository = RegisterRepository::new(Arc::new(connection.clone()));
    let register = DomainRegister {
        id: DomainRegister::generate_id(NEXT_REGISTER_ID.fetch_add(1, Ordering::SeqCst)),
        name: name.to_string(),
        location: "Main building".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    repository
        .store_register(&register)
        .expect("Failed to store test register");
    register
}
