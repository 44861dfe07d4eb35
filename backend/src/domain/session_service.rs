//! Register session workflow: open, count, close.
//!
//! A session is one open-to-close span of a register (typically a working
//! day). At most one session is open per register. Closing bundles a
//! denomination count and free-form notes into the closing record; a close
//! that balances is reconciled on the spot, otherwise the session waits for
//! the reconciliation workflow to post its adjustment.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::commands::sessions::{
    CloseSessionCommand, CloseSessionResult, CountCashCommand, CountCashResult,
    GetCurrentSessionCommand, GetCurrentSessionResult, OpenSessionCommand, OpenSessionResult,
    SessionHistoryQuery, SessionHistoryResult,
};
use crate::domain::errors::LedgerError;
use crate::domain::models::cash_count::{CashCount, CountOutcome, BALANCE_TOLERANCE};
use crate::domain::models::session::{RegisterSession, SessionState};
use crate::domain::register_service::RegisterService;
use crate::domain::transaction_service::TransactionService;
use crate::storage::csv::{CsvConnection, SessionRepository};
use crate::storage::traits::SessionStorage;

/// Service for the open/count/close lifecycle of register sessions
#[derive(Clone)]
pub struct SessionService {
    session_repository: SessionRepository,
    register_service: RegisterService,
    transaction_service: TransactionService,
}

impl SessionService {
    /// Create a new SessionService
    pub fn new(
        csv_conn: Arc<CsvConnection>,
        register_service: RegisterService,
        transaction_service: TransactionService,
    ) -> Self {
        let session_repository = SessionRepository::new((*csv_conn).clone());
        Self {
            session_repository,
            register_service,
            transaction_service,
        }
    }

    /// Open a new session for the register
    pub fn open_session(&self, command: OpenSessionCommand) -> Result<OpenSessionResult> {
        info!("Opening session: {:?}", command);

        if command.opened_by.trim().is_empty() {
            return Err(anyhow::anyhow!("opened_by cannot be empty"));
        }

        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        if self.session_repository.has_open_session(&register.id)? {
            return Err(LedgerError::SessionAlreadyOpen.into());
        }

        let ledger_balance = self.transaction_service.current_balance(&register.id)?;
        let opening_balance = command.opening_balance.unwrap_or(ledger_balance);

        if opening_balance < 0.0 {
            return Err(anyhow::anyhow!("Opening balance cannot be negative"));
        }

        let now_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;
        let session = RegisterSession {
            id: RegisterSession::generate_id(&register.id, now_millis),
            register_id: register.id.clone(),
            opening_balance,
            opened_by: command.opened_by.trim().to_string(),
            opened_at: Utc::now().to_rfc3339(),
            state: SessionState::Open,
            counted_total: None,
            expected_total: None,
            difference: None,
            notes: None,
            closed_by: None,
            closed_at: None,
        };

        self.session_repository.store_session(&session)?;

        // A declared float that differs from the ledger gets posted as an
        // adjustment so the ledger always matches the drawer.
        if (opening_balance - ledger_balance).abs() > BALANCE_TOLERANCE {
            self.transaction_service.post_adjustment(
                &register.id,
                "Opening float adjustment".to_string(),
                opening_balance - ledger_balance,
            )?;
        }

        info!("Opened session {} for register {}", session.id, register.id);

        Ok(OpenSessionResult {
            session,
            success_message: format!(
                "Register '{}' opened with a float of {:.2}",
                register.name, opening_balance
            ),
        })
    }

    /// Get the currently open session, with the drawer total the ledger expects
    pub fn current_session(
        &self,
        command: GetCurrentSessionCommand,
    ) -> Result<GetCurrentSessionResult> {
        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        let session = self.session_repository.get_open_session(&register.id)?;

        let expected_total = match &session {
            Some(session) => Some(self.expected_total(session)?),
            None => None,
        };

        Ok(GetCurrentSessionResult {
            session,
            expected_total,
        })
    }

    /// Tally a drawer against the open session without mutating anything.
    /// This is the mid-day spot check; the same comparison runs at close.
    pub fn count_cash(&self, command: CountCashCommand) -> Result<CountCashResult> {
        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        let session = self
            .session_repository
            .get_open_session(&register.id)?
            .ok_or(LedgerError::SessionNotOpen)?;

        let count = CashCount::new(command.lines);
        count.validate()?;

        let expected_total = self.expected_total(&session)?;
        let outcome = CountOutcome::compare(expected_total, count.counted_total());

        info!(
            "Cash count for register {}: expected {:.2}, counted {:.2}, difference {:+.2}",
            register.id, outcome.expected_total, outcome.counted_total, outcome.difference
        );

        Ok(CountCashResult { outcome })
    }

    /// Close the open session, bundling the final count and notes into the
    /// closing record
    pub fn close_session(&self, command: CloseSessionCommand) -> Result<CloseSessionResult> {
        info!("Closing session for register: {:?}", command.register_id);

        if command.closed_by.trim().is_empty() {
            return Err(anyhow::anyhow!("closed_by cannot be empty"));
        }

        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        let mut session = self
            .session_repository
            .get_open_session(&register.id)?
            .ok_or(LedgerError::SessionNotOpen)?;

        let count = CashCount::new(command.lines);
        count.validate()?;

        let expected_total = self.expected_total(&session)?;
        let outcome = CountOutcome::compare(expected_total, count.counted_total());

        // A balanced close needs no reconciliation step
        session.state = if outcome.balanced {
            SessionState::Reconciled
        } else {
            SessionState::Closed
        };
        session.counted_total = Some(outcome.counted_total);
        session.expected_total = Some(outcome.expected_total);
        session.difference = Some(outcome.difference);
        session.notes = command.notes.clone();
        session.closed_by = Some(command.closed_by.trim().to_string());
        session.closed_at = Some(Utc::now().to_rfc3339());

        self.session_repository.update_session(&session)?;

        let success_message = if outcome.balanced {
            format!("Register '{}' closed and balanced", register.name)
        } else {
            format!(
                "Register '{}' closed with a difference of {:+.2}; reconciliation required",
                register.name, outcome.difference
            )
        };

        info!(
            "Closed session {} ({}): {}",
            session.id,
            session.state.to_string(),
            success_message
        );

        Ok(CloseSessionResult {
            session,
            outcome,
            success_message,
        })
    }

    /// List past sessions, most recent first
    pub fn session_history(&self, query: SessionHistoryQuery) -> Result<SessionHistoryResult> {
        let register = self
            .register_service
            .resolve_register(query.register_id.as_deref())?;

        let sessions = self
            .session_repository
            .list_sessions(&register.id, query.limit)?;

        Ok(SessionHistoryResult { sessions })
    }

    /// What the drawer should hold right now. The running ledger balance is
    /// kept in line with the drawer by opening-float and reconciliation
    /// adjustments, so the expectation is the latest running balance (or the
    /// declared opening float while the ledger is still empty).
    fn expected_total(&self, session: &RegisterSession) -> Result<f64> {
        let ledger_balance = self
            .transaction_service
            .current_balance(&session.register_id)?;
        let has_entries = !self
            .transaction_service
            .list_transactions_chronological(&session.register_id, None, None)?
            .is_empty();

        if has_entries {
            Ok(ledger_balance)
        } else {
            Ok(session.opening_balance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balance_service::BalanceService;
    use crate::domain::commands::registers::{CreateRegisterCommand, SetActiveRegisterCommand};
    use crate::domain::commands::transactions::RecordTransactionCommand;
    use crate::domain::models::cash_count::DenominationLine;

    fn create_test_service() -> (SessionService, TransactionService, tempfile::TempDir) {
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

        (session_service, transaction_service, temp_dir)
    }

    fn record(service: &TransactionService, description: &str, amount: f64) {
        service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: description.to_string(),
                amount,
                date: None,
            })
            .unwrap();
    }

    fn lines(pairs: &[(f64, u32)]) -> Vec<DenominationLine> {
        pairs
            .iter()
            .map(|(denomination, quantity)| DenominationLine {
                denomination: *denomination,
                quantity: *quantity,
            })
            .collect()
    }

    #[test]
    fn test_open_session_defaults_to_ledger_balance() {
        let (session_service, _tx_service, _temp_dir) = create_test_service();

        let result = session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "ana".to_string(),
            })
            .unwrap();

        assert_eq!(result.session.opening_balance, 0.0);
        assert!(result.session.is_open());
    }

    #[test]
    fn test_open_session_with_declared_float_posts_adjustment() {
        let (session_service, tx_service, _temp_dir) = create_test_service();

        let result = session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(120.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        assert_eq!(result.session.opening_balance, 120.0);

        // The ledger was brought in line with the declared float
        let register_id = result.session.register_id;
        assert_eq!(tx_service.current_balance(&register_id).unwrap(), 120.0);
    }

    #[test]
    fn test_second_open_session_rejected() {
        let (session_service, _tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "ana".to_string(),
            })
            .unwrap();

        let result = session_service.open_session(OpenSessionCommand {
            register_id: None,
            opening_balance: None,
            opened_by: "luis".to_string(),
        });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::SessionAlreadyOpen)
        ));
    }

    #[test]
    fn test_count_cash_reports_difference() {
        let (session_service, tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(100.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        record(&tx_service, "Ticket sales", 45.0);
        record(&tx_service, "Stamps", -5.0);

        // Drawer should hold 140; count only finds 135
        let result = session_service
            .count_cash(CountCashCommand {
                register_id: None,
                lines: lines(&[(100.0, 1), (20.0, 1), (10.0, 1), (5.0, 1)]),
            })
            .unwrap();

        assert_eq!(result.outcome.expected_total, 140.0);
        assert_eq!(result.outcome.counted_total, 135.0);
        assert_eq!(result.outcome.difference, -5.0);
        assert!(!result.outcome.balanced);
    }

    #[test]
    fn test_count_cash_requires_open_session() {
        let (session_service, _tx_service, _temp_dir) = create_test_service();

        let result = session_service.count_cash(CountCashCommand {
            register_id: None,
            lines: lines(&[(10.0, 1)]),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_count_cash_rejects_bad_denomination() {
        let (session_service, _tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "ana".to_string(),
            })
            .unwrap();

        let result = session_service.count_cash(CountCashCommand {
            register_id: None,
            lines: lines(&[(0.0, 3)]),
        });
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidDenomination(_))
        ));
    }

    #[test]
    fn test_balanced_close_is_reconciled_immediately() {
        let (session_service, tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(50.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        record(&tx_service, "Ticket sales", 30.0);

        let result = session_service
            .close_session(CloseSessionCommand {
                register_id: None,
                lines: lines(&[(50.0, 1), (20.0, 1), (10.0, 1)]),
                notes: None,
                closed_by: "ana".to_string(),
            })
            .unwrap();

        assert!(result.outcome.balanced);
        assert_eq!(result.session.state, SessionState::Reconciled);
        assert_eq!(result.session.counted_total, Some(80.0));
        assert_eq!(result.session.difference, Some(0.0));
    }

    #[test]
    fn test_unbalanced_close_waits_for_reconciliation() {
        let (session_service, tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(50.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        record(&tx_service, "Ticket sales", 30.0);

        let result = session_service
            .close_session(CloseSessionCommand {
                register_id: None,
                lines: lines(&[(50.0, 1), (20.0, 1)]),
                notes: Some("bill missing from drawer".to_string()),
                closed_by: "ana".to_string(),
            })
            .unwrap();

        assert!(!result.outcome.balanced);
        assert_eq!(result.session.state, SessionState::Closed);
        assert_eq!(result.session.difference, Some(-10.0));
        assert_eq!(result.session.notes.as_deref(), Some("bill missing from drawer"));

        // Recording after close is rejected
        let record_result = tx_service.record_transaction(RecordTransactionCommand {
            register_id: None,
            description: "Late entry".to_string(),
            amount: 5.0,
            date: None,
        });
        assert!(record_result.is_err());
    }

    #[test]
    fn test_session_history() {
        let (session_service, _tx_service, _temp_dir) = create_test_service();

        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "ana".to_string(),
            })
            .unwrap();
        session_service
            .close_session(CloseSessionCommand {
                register_id: None,
                lines: vec![],
                notes: None,
                closed_by: "ana".to_string(),
            })
            .unwrap();
        session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "luis".to_string(),
            })
            .unwrap();

        let history = session_service
            .session_history(SessionHistoryQuery {
                register_id: None,
                limit: None,
            })
            .unwrap();

        assert_eq!(history.sessions.len(), 2);
        assert_eq!(history.sessions[0].opened_by, "luis");
    }
}
