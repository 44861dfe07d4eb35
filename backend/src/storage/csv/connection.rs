use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::traits::Connection;

/// CsvConnection manages file paths and ensures data files exist for each register
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a new CSV connection in the default data directory.
    /// Honors the `CASHBOX_DATA_DIR` environment variable, otherwise uses
    /// the user's Documents folder.
    pub fn new_default() -> Result<Self> {
        let data_dir = match std::env::var("CASHBOX_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => {
                let documents_dir = dirs::document_dir()
                    .or_else(dirs::home_dir)
                    .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
                documents_dir.join("Cashbox")
            }
        };

        info!("Using data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> PathBuf {
        self.base_directory.clone()
    }

    /// Get the directory path for a register's data using its directory name
    pub fn get_register_directory(&self, register_directory: &str) -> PathBuf {
        self.base_directory.join(register_directory)
    }

    /// Get the file path for a register's ledger
    pub fn get_transactions_file_path(&self, register_directory: &str) -> PathBuf {
        self.get_register_directory(register_directory)
            .join("transactions.csv")
    }

    /// Get the file path for a register's session history
    pub fn get_sessions_file_path(&self, register_directory: &str) -> PathBuf {
        self.get_register_directory(register_directory)
            .join("sessions.csv")
    }

    /// Ensure the ledger CSV file exists with proper header for a register
    pub fn ensure_transactions_file_exists(&self, register_directory: &str) -> Result<()> {
        let register_dir = self.get_register_directory(register_directory);

        if !register_dir.exists() {
            fs::create_dir_all(&register_dir)?;
        }

        let file_path = register_dir.join("transactions.csv");

        if !file_path.exists() {
            let header = "id,register_id,date,description,amount,balance,entry_type\n";
            fs::write(&file_path, header)?;
        }

        Ok(())
    }

    /// Ensure the sessions CSV file exists with proper header for a register
    pub fn ensure_sessions_file_exists(&self, register_directory: &str) -> Result<()> {
        let register_dir = self.get_register_directory(register_directory);

        if !register_dir.exists() {
            fs::create_dir_all(&register_dir)?;
        }

        let file_path = register_dir.join("sessions.csv");

        if !file_path.exists() {
            let header = "id,register_id,opening_balance,opened_by,opened_at,state,counted_total,expected_total,difference,notes,closed_by,closed_at\n";
            fs::write(&file_path, header)?;
        }

        Ok(())
    }
}

impl Connection for CsvConnection {
    type TransactionRepository = super::transaction_repository::TransactionRepository;

    fn create_transaction_repository(&self) -> Self::TransactionRepository {
        super::transaction_repository::TransactionRepository::new(self.clone())
    }
}
