//! Axum handlers exposing the cash register workflow over HTTP.
//!
//! The admin front-end (and any other collaborator) talks to these endpoints;
//! handlers translate wire DTOs from the `shared` crate into domain commands
//! and map domain results back. Domain violations surface as 400s, storage
//! failures as 500s.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::DateTime;
use serde::Deserialize;
use tracing::info;

use crate::domain::commands::registers::{
    CreateRegisterCommand, DeleteRegisterCommand, GetRegisterCommand, SetActiveRegisterCommand,
    UpdateRegisterCommand,
};
use crate::domain::commands::reports::{ExportLedgerQuery, ExportToPathCommand, SummaryQuery};
use crate::domain::commands::sessions::{
    CloseSessionCommand, CountCashCommand, GetCurrentSessionCommand, OpenSessionCommand,
    ReconcileSessionCommand, SessionHistoryQuery,
};
use crate::domain::commands::transactions::{
    DeleteTransactionsCommand, RecordTransactionCommand, TransactionListQuery,
};
use crate::domain::models::cash_count::{CountOutcome, DenominationLine};
use crate::domain::models::register::Register as DomainRegister;
use crate::domain::models::session::RegisterSession as DomainSession;
use crate::domain::models::transaction::{
    Transaction as DomainTransaction, TransactionType as DomainTransactionType,
};
use crate::Backend;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub register_service: crate::domain::RegisterService,
    pub transaction_service: crate::domain::TransactionService,
    pub session_service: crate::domain::SessionService,
    pub reconcile_service: crate::domain::ReconcileService,
    pub report_service: crate::domain::ReportService,
}

impl AppState {
    /// Create application state from an assembled backend
    pub fn new(backend: Backend) -> Self {
        Self {
            register_service: backend.register_service,
            transaction_service: backend.transaction_service,
            session_service: backend.session_service,
            reconcile_service: backend.reconcile_service,
            report_service: backend.report_service,
        }
    }
}

fn map_register(register: DomainRegister) -> shared::Register {
    shared::Register {
        id: register.id,
        name: register.name,
        location: register.location,
        created_at: register.created_at.to_rfc3339(),
        updated_at: register.updated_at.to_rfc3339(),
    }
}

fn map_transaction(transaction: DomainTransaction) -> shared::Transaction {
    shared::Transaction {
        id: transaction.id,
        register_id: transaction.register_id,
        date: transaction.date.to_rfc3339(),
        description: transaction.description,
        amount: transaction.amount,
        balance: transaction.balance,
        entry_type: match transaction.entry_type {
            DomainTransactionType::Income => shared::TransactionType::Income,
            DomainTransactionType::Expense => shared::TransactionType::Expense,
            DomainTransactionType::Adjustment => shared::TransactionType::Adjustment,
        },
    }
}

fn map_session(session: DomainSession) -> shared::RegisterSession {
    shared::RegisterSession {
        id: session.id,
        register_id: session.register_id,
        opening_balance: session.opening_balance,
        opened_by: session.opened_by,
        opened_at: session.opened_at,
        state: session.state.to_string(),
        counted_total: session.counted_total,
        expected_total: session.expected_total,
        difference: session.difference,
        notes: session.notes,
        closed_by: session.closed_by,
        closed_at: session.closed_at,
    }
}

fn map_outcome(outcome: CountOutcome) -> shared::CashCountResponse {
    shared::CashCountResponse {
        expected_total: outcome.expected_total,
        counted_total: outcome.counted_total,
        difference: outcome.difference,
        balanced: outcome.balanced,
    }
}

fn map_lines(lines: Vec<shared::DenominationLine>) -> Vec<DenominationLine> {
    lines
        .into_iter()
        .map(|line| DenominationLine {
            denomination: line.denomination,
            quantity: line.quantity,
        })
        .collect()
}

/// Axum handler for GET /api/registers
pub async fn list_registers(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/registers");

    match state.register_service.list_registers() {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::RegisterListResponse {
                registers: result.registers.into_iter().map(map_register).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error listing registers: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing registers").into_response()
        }
    }
}

/// Axum handler for POST /api/registers
pub async fn create_register(
    State(state): State<AppState>,
    Json(request): Json<shared::CreateRegisterRequest>,
) -> impl IntoResponse {
    info!("POST /api/registers - name: {}", request.name);

    let command = CreateRegisterCommand {
        name: request.name,
        location: request.location,
    };

    match state.register_service.create_register(command) {
        Ok(result) => (
            StatusCode::CREATED,
            Json(shared::RegisterResponse {
                register: map_register(result.register),
                success_message: "Register created successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error creating register: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for GET /api/registers/:id
pub async fn get_register(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/registers/{}", register_id);

    match state
        .register_service
        .get_register(GetRegisterCommand { register_id })
    {
        Ok(result) => match result.register {
            Some(register) => (StatusCode::OK, Json(map_register(register))).into_response(),
            None => (StatusCode::NOT_FOUND, "Register not found").into_response(),
        },
        Err(e) => {
            tracing::error!("Error retrieving register: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error retrieving register").into_response()
        }
    }
}

/// Axum handler for PUT /api/registers/:id
pub async fn update_register(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
    Json(request): Json<shared::UpdateRegisterRequest>,
) -> impl IntoResponse {
    info!("PUT /api/registers/{}", register_id);

    let command = UpdateRegisterCommand {
        register_id,
        name: request.name,
        location: request.location,
    };

    match state.register_service.update_register(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::RegisterResponse {
                register: map_register(result.register),
                success_message: "Register updated successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error updating register: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for DELETE /api/registers/:id
pub async fn delete_register(
    State(state): State<AppState>,
    Path(register_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/registers/{}", register_id);

    match state
        .register_service
        .delete_register(DeleteRegisterCommand { register_id })
    {
        Ok(result) => (StatusCode::OK, Json(result.success_message)).into_response(),
        Err(e) => {
            tracing::error!("Error deleting register: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for GET /api/registers/active
pub async fn get_active_register(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/registers/active");

    match state.register_service.get_active_register() {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::ActiveRegisterResponse {
                active_register: result.active_register.register.map(map_register),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error retrieving active register: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving active register",
            )
                .into_response()
        }
    }
}

/// Axum handler for POST /api/registers/active
pub async fn set_active_register(
    State(state): State<AppState>,
    Json(request): Json<shared::SetActiveRegisterRequest>,
) -> impl IntoResponse {
    info!("POST /api/registers/active - register_id: {}", request.register_id);

    let command = SetActiveRegisterCommand {
        register_id: request.register_id,
    };

    match state.register_service.set_active_register(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::SetActiveRegisterResponse {
                success_message: format!("Register '{}' is now active", result.register.name),
                active_register: map_register(result.register),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error setting active register: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Query parameters for the transaction list endpoint
#[derive(Deserialize, Debug)]
pub struct TransactionListParams {
    pub register_id: Option<String>,
    pub after: Option<String>,
    pub limit: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Axum handler for GET /api/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> impl IntoResponse {
    info!("GET /api/transactions - query: {:?}", params);

    let query = TransactionListQuery {
        register_id: params.register_id,
        after: params.after,
        limit: params.limit,
        start_date: params.start_date,
        end_date: params.end_date,
    };

    match state.transaction_service.list_transactions(query) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::TransactionListResponse {
                transactions: result
                    .transactions
                    .into_iter()
                    .map(map_transaction)
                    .collect(),
                pagination: shared::PaginationInfo {
                    has_more: result.pagination.has_more,
                    next_cursor: result.pagination.next_cursor,
                },
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error listing transactions: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing transactions").into_response()
        }
    }
}

/// Axum handler for POST /api/transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<shared::RecordTransactionRequest>,
) -> impl IntoResponse {
    info!("POST /api/transactions - request: {:?}", request);

    let date = match request.date {
        Some(date_str) => match DateTime::parse_from_rfc3339(&date_str) {
            Ok(date) => Some(date),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, format!("Invalid date: {}", e)).into_response();
            }
        },
        None => None,
    };

    let command = RecordTransactionCommand {
        register_id: request.register_id,
        description: request.description,
        amount: request.amount,
        date,
    };

    match state.transaction_service.record_transaction(command) {
        Ok(transaction) => {
            (StatusCode::CREATED, Json(map_transaction(transaction))).into_response()
        }
        Err(e) => {
            tracing::error!("Error creating transaction: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for POST /api/transactions/delete
pub async fn delete_transactions(
    State(state): State<AppState>,
    Json(request): Json<shared::DeleteTransactionsRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/transactions/delete - {} ids",
        request.transaction_ids.len()
    );

    let command = DeleteTransactionsCommand {
        register_id: request.register_id,
        transaction_ids: request.transaction_ids,
    };

    match state.transaction_service.delete_transactions(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::DeleteTransactionsResponse {
                deleted_count: result.deleted_count,
                success_message: result.success_message,
                not_found_ids: result.not_found_ids,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error deleting transactions: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for POST /api/sessions/open
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<shared::OpenSessionRequest>,
) -> impl IntoResponse {
    info!("POST /api/sessions/open - opened_by: {}", request.opened_by);

    let command = OpenSessionCommand {
        register_id: request.register_id,
        opening_balance: request.opening_balance,
        opened_by: request.opened_by,
    };

    match state.session_service.open_session(command) {
        Ok(result) => (
            StatusCode::CREATED,
            Json(shared::SessionResponse {
                session: map_session(result.session),
                success_message: result.success_message,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error opening session: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Query parameters for session endpoints
#[derive(Deserialize, Debug)]
pub struct SessionParams {
    pub register_id: Option<String>,
    pub limit: Option<u32>,
}

/// Axum handler for GET /api/sessions/current
pub async fn get_current_session(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> impl IntoResponse {
    info!("GET /api/sessions/current - query: {:?}", params);

    let command = GetCurrentSessionCommand {
        register_id: params.register_id,
    };

    match state.session_service.current_session(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::CurrentSessionResponse {
                session: result.session.map(map_session),
                expected_total: result.expected_total,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error retrieving current session: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving current session",
            )
                .into_response()
        }
    }
}

/// Axum handler for POST /api/sessions/count
pub async fn count_cash(
    State(state): State<AppState>,
    Json(request): Json<shared::CashCountRequest>,
) -> impl IntoResponse {
    info!("POST /api/sessions/count - {} lines", request.lines.len());

    let command = CountCashCommand {
        register_id: request.register_id,
        lines: map_lines(request.lines),
    };

    match state.session_service.count_cash(command) {
        Ok(result) => (StatusCode::OK, Json(map_outcome(result.outcome))).into_response(),
        Err(e) => {
            tracing::error!("Error counting cash: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for POST /api/sessions/close
pub async fn close_session(
    State(state): State<AppState>,
    Json(request): Json<shared::CloseSessionRequest>,
) -> impl IntoResponse {
    info!("POST /api/sessions/close - closed_by: {}", request.closed_by);

    let command = CloseSessionCommand {
        register_id: request.register_id,
        lines: map_lines(request.lines),
        notes: request.notes,
        closed_by: request.closed_by,
    };

    match state.session_service.close_session(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::CloseSessionResponse {
                session: map_session(result.session),
                outcome: map_outcome(result.outcome),
                success_message: result.success_message,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error closing session: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for POST /api/sessions/reconcile
pub async fn reconcile_session(
    State(state): State<AppState>,
    Json(request): Json<shared::ReconcileSessionRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/sessions/reconcile - session_id: {:?}",
        request.session_id
    );

    let command = ReconcileSessionCommand {
        register_id: request.register_id,
        session_id: request.session_id,
    };

    match state.reconcile_service.reconcile_session(command) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::ReconcileSessionResponse {
                session: map_session(result.session),
                adjustment: result.adjustment.map(map_transaction),
                success_message: result.success_message,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error reconciling session: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> impl IntoResponse {
    info!("GET /api/sessions - query: {:?}", params);

    let query = SessionHistoryQuery {
        register_id: params.register_id,
        limit: params.limit,
    };

    match state.session_service.session_history(query) {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::SessionListResponse {
                sessions: result.sessions.into_iter().map(map_session).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error listing sessions: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing sessions").into_response()
        }
    }
}

/// Query parameters for the summary endpoint
#[derive(Deserialize, Debug)]
pub struct SummaryParams {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Axum handler for GET /api/reports/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> impl IntoResponse {
    info!("GET /api/reports/summary - query: {:?}", params);

    let query = SummaryQuery {
        register_id: params.register_id,
        start_date: params.start_date,
        end_date: params.end_date,
    };

    match state
        .report_service
        .period_summary(query, &state.register_service, &state.transaction_service)
    {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::PeriodSummaryResponse {
                register_name: result.register_name,
                income_total: result.income_total,
                expense_total: result.expense_total,
                adjustment_total: result.adjustment_total,
                net_movement: result.net_movement,
                closing_balance: result.closing_balance,
                transaction_count: result.transaction_count,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error building summary: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error building summary").into_response()
        }
    }
}

/// Axum handler for POST /api/reports/export-data
pub async fn export_ledger_data(
    State(state): State<AppState>,
    Json(request): Json<shared::ExportDataRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/reports/export-data - register_id: {:?}",
        request.register_id
    );

    let query = ExportLedgerQuery {
        register_id: request.register_id,
        start_date: request.start_date,
        end_date: request.end_date,
    };

    match state
        .report_service
        .export_ledger_csv(query, &state.register_service, &state.transaction_service)
    {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::ExportDataResponse {
                csv_content: result.csv_content,
                filename: result.filename,
                transaction_count: result.transaction_count,
                register_name: result.register_name,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error exporting ledger: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// Axum handler for POST /api/reports/export
pub async fn export_ledger_to_path(
    State(state): State<AppState>,
    Json(request): Json<shared::ExportToPathRequest>,
) -> impl IntoResponse {
    info!(
        "POST /api/reports/export - custom_path: {:?}",
        request.custom_path
    );

    let command = ExportToPathCommand {
        register_id: request.register_id,
        start_date: request.start_date,
        end_date: request.end_date,
        custom_path: request.custom_path,
    };

    match state
        .report_service
        .export_to_path(command, &state.register_service, &state.transaction_service)
    {
        Ok(result) => (
            StatusCode::OK,
            Json(shared::ExportToPathResponse {
                success: result.success,
                message: result.message,
                file_path: result.file_path,
                transaction_count: result.transaction_count,
                register_name: result.register_name,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error exporting ledger to path: {:?}", e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
