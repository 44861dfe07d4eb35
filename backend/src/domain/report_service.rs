//! Report service domain logic for the cash register.
//!
//! This module contains the read-aggregation used by the summary views and
//! the CSV export, including orchestration of register lookup, ledger
//! retrieval, and file operations. The UI should only handle presentation
//! concerns.

use anyhow::Result;
use chrono::Utc;
use log::{error, info};
use std::fs;

use crate::domain::commands::reports::{
    ExportLedgerQuery, ExportLedgerResult, ExportToPathCommand, ExportToPathResult,
    PeriodSummaryResult, SummaryQuery,
};
use crate::domain::models::transaction::TransactionType;
use crate::domain::register_service::RegisterService;
use crate::domain::transaction_service::TransactionService;

/// Report service that handles summary and export business logic
#[derive(Clone)]
pub struct ReportService {
    // No internal state needed for now
}

impl ReportService {
    /// Create a new ReportService instance
    pub fn new() -> Self {
        Self {}
    }

    /// Aggregate ledger movement over a date range
    pub fn period_summary(
        &self,
        query: SummaryQuery,
        register_service: &RegisterService,
        transaction_service: &TransactionService,
    ) -> Result<PeriodSummaryResult> {
        let register = register_service.resolve_register(query.register_id.as_deref())?;

        let transactions = transaction_service.list_transactions_chronological(
            &register.id,
            query.start_date.clone(),
            query.end_date.clone(),
        )?;

        let mut income_total = 0.0;
        let mut expense_total = 0.0;
        let mut adjustment_total = 0.0;

        for transaction in &transactions {
            match transaction.entry_type {
                TransactionType::Income => income_total += transaction.amount,
                TransactionType::Expense => expense_total += transaction.amount.abs(),
                TransactionType::Adjustment => adjustment_total += transaction.amount,
            }
        }

        let net_movement = income_total - expense_total + adjustment_total;
        let closing_balance = transactions.last().map(|tx| tx.balance).unwrap_or(0.0);

        Ok(PeriodSummaryResult {
            register_name: register.name,
            income_total,
            expense_total,
            adjustment_total,
            net_movement,
            closing_balance,
            transaction_count: transactions.len(),
        })
    }

    /// Export the ledger as CSV data with complete orchestration
    pub fn export_ledger_csv(
        &self,
        query: ExportLedgerQuery,
        register_service: &RegisterService,
        transaction_service: &TransactionService,
    ) -> Result<ExportLedgerResult> {
        let register = register_service.resolve_register(query.register_id.as_deref())?;

        info!("Exporting ledger as CSV for register: {}", register.name);

        let transactions = transaction_service.list_transactions_chronological(
            &register.id,
            query.start_date.clone(),
            query.end_date.clone(),
        )?;

        let mut csv_content = String::new();
        csv_content.push_str("entry,date,description,type,amount,balance\n");

        for (index, transaction) in transactions.iter().enumerate() {
            let formatted_date = transaction.date.format("%Y/%m/%d").to_string();

            let row = format!(
                "{},{},\"{}\",{},{:.2},{:.2}\n",
                index + 1,
                formatted_date,
                transaction.description.replace('"', "\"\""), // Escape quotes in description
                transaction.entry_type.as_str(),
                transaction.amount,
                transaction.balance
            );
            csv_content.push_str(&row);
        }

        let now = Utc::now();
        let filename = format!(
            "{}_ledger_{}.csv",
            register.name.replace(' ', "_").to_lowercase(),
            now.format("%Y%m%d")
        );

        let result = ExportLedgerResult {
            csv_content,
            filename,
            transaction_count: transactions.len(),
            register_name: register.name,
        };

        info!(
            "Exported {} entries for register {} ({} bytes) with filename: {}",
            result.transaction_count,
            result.register_name,
            result.csv_content.len(),
            result.filename
        );

        Ok(result)
    }

    /// Export the ledger directly to a path (or the default location)
    pub fn export_to_path(
        &self,
        command: ExportToPathCommand,
        register_service: &RegisterService,
        transaction_service: &TransactionService,
    ) -> Result<ExportToPathResult> {
        info!("Exporting to path - custom_path: {:?}", command.custom_path);

        let export_query = ExportLedgerQuery {
            register_id: command.register_id.clone(),
            start_date: command.start_date.clone(),
            end_date: command.end_date.clone(),
        };

        let export = self.export_ledger_csv(export_query, register_service, transaction_service)?;

        let export_dir = match command.custom_path.clone() {
            Some(custom_path) if !custom_path.trim().is_empty() => {
                let cleaned_path = self.sanitize_path(&custom_path);
                std::path::PathBuf::from(cleaned_path)
            }
            _ => {
                // Default location: Documents folder, falling back to home
                match dirs::document_dir().or_else(dirs::home_dir) {
                    Some(dir) => dir,
                    None => {
                        error!("Could not determine default export directory");
                        return Ok(ExportToPathResult {
                            success: false,
                            message: "Failed to determine export directory".to_string(),
                            file_path: String::new(),
                            transaction_count: 0,
                            register_name: String::new(),
                        });
                    }
                }
            }
        };

        let file_path = export_dir.join(&export.filename);

        if let Some(parent_dir) = file_path.parent() {
            if let Err(e) = fs::create_dir_all(parent_dir) {
                error!("Failed to create export directory {:?}: {}", parent_dir, e);
                return Ok(ExportToPathResult {
                    success: false,
                    message: format!("Failed to create export directory: {}", e),
                    file_path: parent_dir.to_string_lossy().to_string(),
                    transaction_count: 0,
                    register_name: String::new(),
                });
            }
        }

        match fs::write(&file_path, &export.csv_content) {
            Ok(_) => {
                let file_path_str = file_path.to_string_lossy().to_string();
                info!(
                    "Exported {} entries for {} to: {}",
                    export.transaction_count, export.register_name, file_path_str
                );

                Ok(ExportToPathResult {
                    success: true,
                    message: format!("File exported successfully to: {}", file_path_str),
                    file_path: file_path_str,
                    transaction_count: export.transaction_count,
                    register_name: export.register_name,
                })
            }
            Err(e) => {
                error!("Failed to write export file to {:?}: {}", file_path, e);
                Ok(ExportToPathResult {
                    success: false,
                    message: format!("Failed to write export file: {}", e),
                    file_path: file_path.to_string_lossy().to_string(),
                    transaction_count: 0,
                    register_name: String::new(),
                })
            }
        }
    }

    /// Basic path sanitization to handle common user input issues
    fn sanitize_path(&self, path: &str) -> String {
        let mut cleaned = path.trim().to_string();

        // Remove surrounding quotes (single or double)
        if (cleaned.starts_with('"') && cleaned.ends_with('"'))
            || (cleaned.starts_with('\'') && cleaned.ends_with('\''))
        {
            cleaned = cleaned[1..cleaned.len() - 1].to_string();
        }

        cleaned = cleaned.trim().to_string();

        // Handle escaped spaces (common on some systems)
        cleaned = cleaned.replace("\\ ", " ");

        // Remove any trailing slashes/backslashes
        while cleaned.ends_with('/') || cleaned.ends_with('\\') {
            cleaned.pop();
        }

        // Handle tilde expansion for home directory
        if cleaned.starts_with('~') {
            if let Some(home) = dirs::home_dir() {
                if cleaned == "~" {
                    cleaned = home.to_string_lossy().to_string();
                } else if cleaned.starts_with("~/") || cleaned.starts_with("~\\") {
                    cleaned = home.join(&cleaned[2..]).to_string_lossy().to_string();
                }
            }
        }

        cleaned
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balance_service::BalanceService;
    use crate::domain::commands::registers::{CreateRegisterCommand, SetActiveRegisterCommand};
    use crate::domain::commands::sessions::OpenSessionCommand;
    use crate::domain::commands::transactions::RecordTransactionCommand;
    use crate::domain::session_service::SessionService;
    use crate::storage::csv::CsvConnection;
    use std::sync::Arc;

    fn create_test_stack() -> (
        ReportService,
        RegisterService,
        TransactionService,
        SessionService,
        tempfile::TempDir,
    ) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        let register_service = RegisterService::new(connection.clone());
        let balance_service = BalanceService::new(connection.clone());
        let transaction_service = TransactionService::new(
            connection.clone(),
            register_service.clone(),
            balance_service,
        );
        let session_service = SessionService::new(
            connection.clone(),
            register_service.clone(),
            transaction_service.clone(),
        );

        let created = register_service
            .create_register(CreateRegisterCommand {
                name: "Front Desk".to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();
        register_service
            .set_active_register(SetActiveRegisterCommand {
                register_id: created.register.id,
            })
            .unwrap();

        (
            ReportService::new(),
            register_service,
            transaction_service,
            session_service,
            temp_dir,
        )
    }

    fn seed_ledger(transaction_service: &TransactionService, session_service: &SessionService) {
        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(100.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        transaction_service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Ticket sales".to_string(),
                amount: 45.0,
                date: None,
            })
            .unwrap();
        transaction_service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Art supplies".to_string(),
                amount: -20.0,
                date: None,
            })
            .unwrap();
    }

    #[test]
    fn test_period_summary_totals_by_entry_type() {
        let (report_service, register_service, transaction_service, session_service, _temp_dir) =
            create_test_stack();
        seed_ledger(&transaction_service, &session_service);

        let summary = report_service
            .period_summary(
                SummaryQuery {
                    register_id: None,
                    start_date: None,
                    end_date: None,
                },
                &register_service,
                &transaction_service,
            )
            .unwrap();

        assert_eq!(summary.register_name, "Front Desk");
        assert_eq!(summary.income_total, 45.0);
        assert_eq!(summary.expense_total, 20.0);
        // The opening float was posted as an adjustment
        assert_eq!(summary.adjustment_total, 100.0);
        assert_eq!(summary.net_movement, 125.0);
        assert_eq!(summary.closing_balance, 125.0);
        assert_eq!(summary.transaction_count, 3);
    }

    #[test]
    fn test_export_ledger_csv_content() {
        let (report_service, register_service, transaction_service, session_service, _temp_dir) =
            create_test_stack();
        seed_ledger(&transaction_service, &session_service);

        let export = report_service
            .export_ledger_csv(
                ExportLedgerQuery {
                    register_id: None,
                    start_date: None,
                    end_date: None,
                },
                &register_service,
                &transaction_service,
            )
            .unwrap();

        assert_eq!(export.transaction_count, 3);
        assert!(export.filename.starts_with("front_desk_ledger_"));
        assert!(export.filename.ends_with(".csv"));

        let lines: Vec<&str> = export.csv_content.lines().collect();
        assert_eq!(lines[0], "entry,date,description,type,amount,balance");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("\"Opening float adjustment\""));
        assert!(lines[2].contains("\"Ticket sales\""));
        assert!(lines[3].contains("-20.00"));
    }

    #[test]
    fn test_export_to_path_writes_file() {
        let (report_service, register_service, transaction_service, session_service, temp_dir) =
            create_test_stack();
        seed_ledger(&transaction_service, &session_service);

        let target = temp_dir.path().join("exports");
        let result = report_service
            .export_to_path(
                ExportToPathCommand {
                    register_id: None,
                    start_date: None,
                    end_date: None,
                    custom_path: Some(target.to_string_lossy().to_string()),
                },
                &register_service,
                &transaction_service,
            )
            .unwrap();

        assert!(result.success, "export failed: {}", result.message);
        let written = fs::read_to_string(&result.file_path).unwrap();
        assert!(written.starts_with("entry,date,description,type,amount,balance"));
    }

    #[test]
    fn test_sanitize_path() {
        let service = ReportService::new();

        // Space handling
        assert_eq!(service.sanitize_path("  /path/to/dir  "), "/path/to/dir");
        assert_eq!(service.sanitize_path("/path\\ to\\ dir"), "/path to dir");

        // Quote removal
        assert_eq!(service.sanitize_path("\"/path/to/dir\""), "/path/to/dir");
        assert_eq!(service.sanitize_path("'/path/to/dir'"), "/path/to/dir");

        // Trailing slash removal
        assert_eq!(service.sanitize_path("/path/to/dir/"), "/path/to/dir");
        assert_eq!(service.sanitize_path("/path/to/dir\\"), "/path/to/dir");
    }
}
