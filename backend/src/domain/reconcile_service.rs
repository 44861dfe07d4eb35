//! Reconciliation of closed sessions.
//!
//! A close that did not balance leaves the session in the `closed` state with
//! a recorded difference. Reconciling posts a signed adjustment entry of
//! exactly that difference, so the stored ledger balance converges to the
//! counted drawer, and marks the session reconciled.

use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::domain::commands::sessions::{ReconcileSessionCommand, ReconcileSessionResult};
use crate::domain::errors::LedgerError;
use crate::domain::models::cash_count::BALANCE_TOLERANCE;
use crate::domain::models::session::SessionState;
use crate::domain::register_service::RegisterService;
use crate::domain::transaction_service::TransactionService;
use crate::storage::csv::{CsvConnection, SessionRepository};
use crate::storage::traits::SessionStorage;

/// Service that settles counted-vs-expected discrepancies
#[derive(Clone)]
pub struct ReconcileService {
    session_repository: SessionRepository,
    register_service: RegisterService,
    transaction_service: TransactionService,
}

impl ReconcileService {
    /// Create a new ReconcileService
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

    /// Reconcile a closed session by posting its variance as an adjustment
    pub fn reconcile_session(
        &self,
        command: ReconcileSessionCommand,
    ) -> Result<ReconcileSessionResult> {
        info!("Reconciling session: {:?}", command);

        let register = self
            .register_service
            .resolve_register(command.register_id.as_deref())?;

        let mut session = match command.session_id {
            Some(session_id) => self
                .session_repository
                .get_session(&register.id, &session_id)?
                .ok_or_else(|| anyhow::anyhow!("Session not found: {}", session_id))?,
            None => self
                .session_repository
                .get_latest_closed_session(&register.id)?
                .ok_or_else(|| {
                    anyhow::anyhow!("No closed session awaiting reconciliation")
                })?,
        };

        if session.state != SessionState::Closed {
            return Err(LedgerError::NotAwaitingReconciliation(session.id).into());
        }

        let difference = session.difference.unwrap_or(0.0);

        let adjustment = if difference.abs() > BALANCE_TOLERANCE {
            let closed_at = session
                .closed_at
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339());
            let description = match &session.notes {
                Some(notes) => format!("Cash count adjustment: {}", notes),
                None => format!("Cash count adjustment for close on {}", closed_at),
            };
            Some(self.transaction_service.post_adjustment(
                &register.id,
                description,
                difference,
            )?)
        } else {
            None
        };

        session.state = SessionState::Reconciled;
        self.session_repository.update_session(&session)?;

        let success_message = match &adjustment {
            Some(adjustment) => format!(
                "Session reconciled with an adjustment of {:+.2}; new balance {:.2}",
                adjustment.amount, adjustment.balance
            ),
            None => "Session reconciled; no adjustment needed".to_string(),
        };

        info!("Reconciled session {}: {}", session.id, success_message);

        Ok(ReconcileSessionResult {
            session,
            adjustment,
            success_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::balance_service::BalanceService;
    use crate::domain::commands::registers::{CreateRegisterCommand, SetActiveRegisterCommand};
    use crate::domain::commands::sessions::{CloseSessionCommand, OpenSessionCommand};
    use crate::domain::commands::transactions::RecordTransactionCommand;
    use crate::domain::models::cash_count::DenominationLine;
    use crate::domain::models::transaction::TransactionType;
    use crate::domain::session_service::SessionService;

    struct TestStack {
        session_service: SessionService,
        transaction_service: TransactionService,
        reconcile_service: ReconcileService,
        register_id: String,
        _temp_dir: tempfile::TempDir,
    }

    fn create_test_stack() -> TestStack {
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
        let reconcile_service = ReconcileService::new(
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
        let register_id = created.register.id.clone();
        register_service
            .set_active_register(SetActiveRegisterCommand {
                register_id: register_id.clone(),
            })
            .unwrap();

        TestStack {
            session_service,
            transaction_service,
            reconcile_service,
            register_id,
            _temp_dir: temp_dir,
        }
    }

    fn close_with_shortfall(stack: &TestStack) -> f64 {
        stack
            .session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: Some(100.0),
                opened_by: "ana".to_string(),
            })
            .unwrap();

        stack
            .transaction_service
            .record_transaction(RecordTransactionCommand {
                register_id: None,
                description: "Ticket sales".to_string(),
                amount: 40.0,
                date: None,
            })
            .unwrap();

        // Expected 140, counted 132: drawer is 8 short
        let close = stack
            .session_service
            .close_session(CloseSessionCommand {
                register_id: None,
                lines: vec![
                    DenominationLine {
                        denomination: 100.0,
                        quantity: 1,
                    },
                    DenominationLine {
                        denomination: 20.0,
                        quantity: 1,
                    },
                    DenominationLine {
                        denomination: 10.0,
                        quantity: 1,
                    },
                    DenominationLine {
                        denomination: 1.0,
                        quantity: 2,
                    },
                ],
                notes: Some("unexplained shortfall".to_string()),
                closed_by: "ana".to_string(),
            })
            .unwrap();

        close.outcome.difference
    }

    #[test]
    fn test_reconcile_posts_signed_adjustment_and_updates_balance() {
        let stack = create_test_stack();
        let difference = close_with_shortfall(&stack);
        assert_eq!(difference, -8.0);

        let result = stack
            .reconcile_service
            .reconcile_session(ReconcileSessionCommand {
                register_id: None,
                session_id: None,
            })
            .unwrap();

        assert_eq!(result.session.state, SessionState::Reconciled);

        let adjustment = result.adjustment.expect("Adjustment should be posted");
        assert_eq!(adjustment.amount, -8.0);
        assert_eq!(adjustment.entry_type, TransactionType::Adjustment);

        // The stored balance now matches the counted drawer
        assert_eq!(
            stack
                .transaction_service
                .current_balance(&stack.register_id)
                .unwrap(),
            132.0
        );
    }

    #[test]
    fn test_reconcile_twice_fails() {
        let stack = create_test_stack();
        close_with_shortfall(&stack);

        stack
            .reconcile_service
            .reconcile_session(ReconcileSessionCommand {
                register_id: None,
                session_id: None,
            })
            .unwrap();

        let result = stack
            .reconcile_service
            .reconcile_session(ReconcileSessionCommand {
                register_id: None,
                session_id: None,
            });
        assert!(result.is_err());
    }

    #[test]
    fn test_reconcile_specific_session_not_closed_fails() {
        let stack = create_test_stack();

        let opened = stack
            .session_service
            .open_session(OpenSessionCommand {
                register_id: None,
                opening_balance: None,
                opened_by: "ana".to_string(),
            })
            .unwrap();

        let result = stack
            .reconcile_service
            .reconcile_session(ReconcileSessionCommand {
                register_id: None,
                session_id: Some(opened.session.id),
            });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::NotAwaitingReconciliation(_))
        ));
    }

    #[test]
    fn test_reconcile_with_no_closed_session_fails() {
        let stack = create_test_stack();

        let result = stack
            .reconcile_service
            .reconcile_session(ReconcileSessionCommand {
                register_id: None,
                session_id: None,
            });
        assert!(result.is_err());
    }
}
