//! Queries and results for summaries and exports.

#[derive(Debug, Clone)]
pub struct SummaryQuery {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PeriodSummaryResult {
    pub register_name: String,
    pub income_total: f64,
    pub expense_total: f64,
    pub adjustment_total: f64,
    pub net_movement: f64,
    pub closing_balance: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone)]
pub struct ExportLedgerQuery {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportLedgerResult {
    pub csv_content: String,
    pub filename: String,
    pub transaction_count: usize,
    pub register_name: String,
}

#[derive(Debug, Clone)]
pub struct ExportToPathCommand {
    pub register_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub custom_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportToPathResult {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub transaction_count: usize,
    pub register_name: String,
}
