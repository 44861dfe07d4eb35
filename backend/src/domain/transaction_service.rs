//! Transaction recorder for the cash register ledger.
//!
//! Income and expense entries can only be recorded while the register has an
//! open session, and an expense may never take the drawer below zero. Every
//! stored entry carries the running balance after it; backdated entries
//! trigger a balance recalculation of everything that follows.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::balance_service::BalanceService;
use crate::domain::commands::transactions::{
    DeleteTransactionsCommand, DeleteTransactionsResult, PaginationInfo as DomainPagination,
    RecordTransactionCommand, TransactionListQuery, TransactionListResult,
};
use crate::domain::errors::LedgerError;
use crate::domain::models::cash_count::BALANCE_TOLERANCE;
use crate::domain::models::transaction::{
    Transaction as DomainTransaction, TransactionType as DomainTransactionType,
};
use crate::domain::register_service::RegisterService;
use crate::storage::csv::{CsvConnection, SessionRepository, TransactionRepository};
use crate::storage::traits::{SessionStorage, TransactionStorage};

#[derive(Clone)]
pub struct TransactionService {
    transaction_repository: TransactionRepository,
    register_service: RegisterService,
    balance_service: BalanceService<CsvConnection>,
    session_repository: SessionRepository,
}

impl TransactionService {
    pub fn new(
        connection: Arc<CsvConnection>,
        register_service: RegisterService,
        balance_service: BalanceService<CsvConnection>,
    ) -> Self {
        let transaction_repository = TransactionRepository::new((*connection).clone());
        let session_repository = SessionRepository::new((*connection).clone());
        Self {
            transaction_repository,
            register_service,
            balance_service,
            session_repository,
        }
    }

    /// Record an income or expense entry against the register
    pub fn record_transaction(
        &self,
        command: RecordTransactionCommand,
    ) -> Result<DomainTransaction> {
        if command.description.is_empty() || command.description.len() > 256 {
            return Err(LedgerError::InvalidDescription.into());
        }

        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        // Entries are only accepted while the register is open
        if !self.session_repository.has_open_session(&register.id)? {
            return Err(LedgerError::SessionNotOpen.into());
        }

        // An expense may not exceed what the drawer holds
        if command.amount < 0.0 {
            let available = self.current_balance(&register.id)?;
            if available + command.amount < -BALANCE_TOLERANCE {
                return Err(LedgerError::InsufficientFunds {
                    requested: command.amount.abs(),
                    available,
                }
                .into());
            }
        }

        let transaction_date = command.date.unwrap_or_else(|| Utc::now().fixed_offset());
        let entry_type = DomainTransactionType::from_amount(command.amount);

        self.create_transaction_internal(
            &register.id,
            transaction_date,
            command.description,
            command.amount,
            entry_type,
        )
    }

    /// Private unified function for creating any ledger entry
    fn create_transaction_internal(
        &self,
        register_id: &str,
        date: chrono::DateTime<chrono::FixedOffset>,
        description: String,
        amount: f64,
        entry_type: DomainTransactionType,
    ) -> Result<DomainTransaction> {
        let now_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;
        let transaction_id = DomainTransaction::generate_id(&entry_type, now_millis);

        let transaction_balance = self.balance_service.calculate_balance_for_new_transaction(
            register_id,
            &date.to_rfc3339(),
            amount,
        )?;

        let domain_transaction = DomainTransaction {
            id: transaction_id,
            register_id: register_id.to_string(),
            date,
            description,
            amount,
            balance: transaction_balance,
            entry_type,
        };

        self.transaction_repository
            .store_transaction(&domain_transaction)?;

        if self
            .balance_service
            .requires_balance_recalculation(register_id, &date.to_rfc3339())?
        {
            self.balance_service
                .recalculate_balances_from_date(register_id, &date.to_rfc3339())?;
        }

        Ok(domain_transaction)
    }

    /// Post a signed adjustment entry, bypassing the open-session gate.
    /// Used by the session workflow for opening floats and reconciliation.
    pub(crate) fn post_adjustment(
        &self,
        register_id: &str,
        description: String,
        amount: f64,
    ) -> Result<DomainTransaction> {
        info!(
            "Posting adjustment of {:+.2} to register {}: {}",
            amount, register_id, description
        );
        self.create_transaction_internal(
            register_id,
            Utc::now().fixed_offset(),
            description,
            amount,
            DomainTransactionType::Adjustment,
        )
    }

    /// Current ledger balance of a register (the drawer's expected content)
    pub fn current_balance(&self, register_id: &str) -> Result<f64> {
        Ok(self
            .transaction_repository
            .get_latest_transaction(register_id)?
            .map(|tx| tx.balance)
            .unwrap_or(0.0))
    }

    pub fn list_transactions(&self, query: TransactionListQuery) -> Result<TransactionListResult> {
        let register = self
            .register_service
            .resolve_register(query.register_id.as_deref())?;

        let limit = query.limit.unwrap_or(20);
        let query_limit = limit + 1;

        // Decide which repository method to use based on date filters
        let mut db_transactions = if query.start_date.is_some() || query.end_date.is_some() {
            // Fetch chronologically within range then reverse so newest first
            let mut txs = self.transaction_repository.list_transactions_chronological(
                &register.id,
                query.start_date.clone(),
                query.end_date.clone(),
            )?;
            txs.reverse();
            // Apply cursor & limit manually (IDs are unique)
            if let Some(after_id) = query.after.clone() {
                if let Some(idx) = txs.iter().position(|t| t.id == after_id) {
                    txs = txs.into_iter().skip(idx + 1).collect();
                }
            }
            txs.truncate(query_limit as usize);
            txs
        } else {
            self.transaction_repository
                .list_transactions(&register.id, Some(query_limit), query.after)?
        };

        db_transactions.sort_by(|a, b| b.date.cmp(&a.date));

        let has_more = db_transactions.len() > limit as usize;
        if has_more {
            db_transactions.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            db_transactions.last().map(|t| t.id.clone())
        } else {
            None
        };

        Ok(TransactionListResult {
            transactions: db_transactions,
            pagination: DomainPagination {
                has_more,
                next_cursor,
            },
        })
    }

    /// Full chronological ledger with optional date filtering.
    /// Used by the summary and export views.
    pub fn list_transactions_chronological(
        &self,
        register_id: &str,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<DomainTransaction>> {
        self.transaction_repository
            .list_transactions_chronological(register_id, start_date, end_date)
    }

    pub fn delete_transactions(
        &self,
        command: DeleteTransactionsCommand,
    ) -> Result<DeleteTransactionsResult> {
        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        let existing_ids = self
            .transaction_repository
            .check_transactions_exist(&register.id, &command.transaction_ids)?;
        let not_found_ids: Vec<String> = command
            .transaction_ids
            .iter()
            .filter(|id| !existing_ids.contains(id))
            .cloned()
            .collect();

        let deleted_count = if !existing_ids.is_empty() {
            self.transaction_repository
                .delete_transactions(&register.id, &existing_ids)?
        } else {
            0
        };

        if deleted_count > 0 {
            self.balance_service
                .recalculate_balances_from_date(&register.id, "1970-01-01T00:00:00Z")?;
        }

        let success_message = match deleted_count {
            0 => "No transactions were deleted".to_string(),
            1 => "1 transaction deleted successfully".to_string(),
            n => format!("{} transactions deleted successfully", n),
        };

        Ok(DeleteTransactionsResult {
            deleted_count: deleted_count as usize,
            success_message,
            not_found_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::registers::{CreateRegisterCommand, SetActiveRegisterCommand};
    use crate::domain::models::session::{RegisterSession, SessionState};
    use crate::storage::csv::CsvConnection;

    fn create_test_service() -> (TransactionService, Arc<CsvConnection>, tempfile::TempDir) {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        let register_service = RegisterService::new(connection.clone());
        let balance_service = BalanceService::new(connection.clone());
        let transaction_service =
            TransactionService::new(connection.clone(), register_service, balance_service);
        (transaction_service, connection, temp_dir)
    }

    fn create_active_register(service: &TransactionService, name: &str) -> String {
        let created = service
            .register_service
            .create_register(CreateRegisterCommand {
                name: name.to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();
        service
            .register_service
            .set_active_register(SetActiveRegisterCommand {
                register_id: created.register.id.clone(),
            })
            .unwrap();
        created.register.id
    }

    fn open_test_session(service: &TransactionService, register_id: &str, opening_balance: f64) {
        let session = RegisterSession {
            id: RegisterSession::generate_id(register_id, 1),
            register_id: register_id.to_string(),
            opening_balance,
            opened_by: "ana".to_string(),
            opened_at: "2025-01-01T08:00:00+00:00".to_string(),
            state: SessionState::Open,
            counted_total: None,
            expected_total: None,
            difference: None,
            notes: None,
            closed_by: None,
            closed_at: None,
        };
        service.session_repository.store_session(&session).unwrap();
    }

    #[test]
    fn test_record_income_basic() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        let transaction = service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Workshop fees".to_string(),
                amount: 10.0,
                date: None,
            })
            .unwrap();

        assert_eq!(transaction.amount, 10.0);
        assert_eq!(transaction.description, "Workshop fees");
        assert_eq!(transaction.balance, 10.0);
        assert_eq!(transaction.entry_type, DomainTransactionType::Income);
    }

    #[test]
    fn test_record_without_open_session_rejected() {
        let (service, _conn, _temp_dir) = create_test_service();
        create_active_register(&service, "Front Desk");

        let result = service.record_transaction(RecordTransactionCommand {
            register_id: None,
            description: "Workshop fees".to_string(),
            amount: 10.0,
            date: None,
        });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::SessionNotOpen)
        ));
    }

    #[test]
    fn test_expense_exceeding_balance_rejected() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Ticket sales".to_string(),
                amount: 30.0,
                date: None,
            })
            .unwrap();

        let result = service.record_transaction(RecordTransactionCommand {
            register_id: None,
            description: "Art supplies".to_string(),
            amount: -50.0,
            date: None,
        });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InsufficientFunds { .. })
        ));

        // The ledger is untouched
        assert_eq!(service.current_balance(&register_id).unwrap(), 30.0);
    }

    #[test]
    fn test_expense_within_balance_accepted() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Ticket sales".to_string(),
                amount: 30.0,
                date: None,
            })
            .unwrap();

        let expense = service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Art supplies".to_string(),
                amount: -30.0,
                date: None,
            })
            .unwrap();

        assert_eq!(expense.entry_type, DomainTransactionType::Expense);
        assert!(expense.balance.abs() < 0.001);
    }

    #[test]
    fn test_description_validation() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        let result = service.record_transaction(RecordTransactionCommand {
            register_id: None,
            description: "".to_string(),
            amount: 10.0,
            date: None,
        });
        assert!(result.is_err());

        let result = service.record_transaction(RecordTransactionCommand {
            register_id: None,
            description: "x".repeat(257),
            amount: 10.0,
            date: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_list_transactions_pagination() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        for i in 0..3 {
            let date = chrono::DateTime::parse_from_rfc3339(&format!(
                "2025-01-0{}T10:00:00+00:00",
                i + 1
            ))
            .unwrap();
            service
                .record_transaction(RecordTransactionCommand {
                    register_id: None,
                    description: format!("Entry {}", i),
                    amount: 10.0,
                    date: Some(date),
                })
                .unwrap();
        }

        let page = service
            .list_transactions(TransactionListQuery {
                register_id: None,
                after: None,
                limit: Some(2),
                start_date: None,
                end_date: None,
            })
            .unwrap();

        assert_eq!(page.transactions.len(), 2);
        assert!(page.pagination.has_more);
        assert_eq!(page.transactions[0].description, "Entry 2");

        let next_page = service
            .list_transactions(TransactionListQuery {
                register_id: None,
                after: page.pagination.next_cursor.clone(),
                limit: Some(2),
                start_date: None,
                end_date: None,
            })
            .unwrap();

        assert_eq!(next_page.transactions.len(), 1);
        assert!(!next_page.pagination.has_more);
    }

    #[test]
    fn test_delete_transactions_recalculates_balances() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        let first = service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "First".to_string(),
                amount: 10.0,
                date: Some(
                    chrono::DateTime::parse_from_rfc3339("2025-01-01T10:00:00+00:00").unwrap(),
                ),
            })
            .unwrap();
        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Second".to_string(),
                amount: 20.0,
                date: Some(
                    chrono::DateTime::parse_from_rfc3339("2025-01-02T10:00:00+00:00").unwrap(),
                ),
            })
            .unwrap();

        let result = service
            .delete_transactions(DeleteTransactionsCommand {
                register_id: None,
                transaction_ids: vec![first.id.clone(), "transaction::income::999".to_string()],
            })
            .unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.not_found_ids.len(), 1);
        assert_eq!(service.current_balance(&register_id).unwrap(), 20.0);
    }

    #[test]
    fn test_backdated_entry_triggers_recalculation() {
        let (service, _conn, _temp_dir) = create_test_service();
        let register_id = create_active_register(&service, "Front Desk");
        open_test_session(&service, &register_id, 0.0);

        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Later entry".to_string(),
                amount: 100.0,
                date: Some(
                    chrono::DateTime::parse_from_rfc3339("2025-01-10T10:00:00+00:00").unwrap(),
                ),
            })
            .unwrap();

        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Backdated entry".to_string(),
                amount: 25.0,
                date: Some(
                    chrono::DateTime::parse_from_rfc3339("2025-01-05T10:00:00+00:00").unwrap(),
                ),
            })
            .unwrap();

        assert_eq!(service.current_balance(&register_id).unwrap(), 125.0);

        let balance_service = BalanceService::new(_conn.clone());
        let errors: Vec<String> = balance_service.validate_all_balances(&register_id).unwrap();
        assert!(errors.is_empty(), "Balances should reconcile: {:?}", errors);
    }
}
