//! Balance management service for the cash register ledger.
//!
//! This service handles the logic of recalculating running balances when
//! backdated entries are inserted. It ensures that all subsequent entries
//! have their balances updated correctly to maintain ledger integrity.

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use log::{info, warn};
use std::sync::Arc;

use crate::storage::traits::{Connection, TransactionStorage};

/// Service responsible for balance calculations and recalculations
#[derive(Clone)]
pub struct BalanceService<C: Connection> {
    transaction_repository: C::TransactionRepository,
}

impl<C: Connection> BalanceService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        let transaction_repository = connection.create_transaction_repository();
        Self {
            transaction_repository,
        }
    }

    /// Recalculate all balances from a specific date forward.
    /// This is called when a backdated entry is inserted.
    ///
    /// The algorithm:
    /// 1. Get all entries from the backdated date forward (chronological order)
    /// 2. Calculate the starting balance (balance before the first entry in the list)
    /// 3. Recalculate each entry's balance based on the running total
    /// 4. Update all affected entries in storage
    pub fn recalculate_balances_from_date(&self, register_id: &str, from_date: &str) -> Result<usize> {
        info!(
            "Starting balance recalculation for register {} from date {}",
            register_id, from_date
        );

        let mut transactions = self
            .transaction_repository
            .get_transactions_since(register_id, from_date)?;

        if transactions.is_empty() {
            info!("No entries found after {}, no balance recalculation needed", from_date);
            return Ok(0);
        }

        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        info!("Found {} entries to recalculate", transactions.len());

        let starting_balance = self.calculate_starting_balance(register_id, from_date)?;
        info!("Starting balance for recalculation: {:.2}", starting_balance);

        let mut running_balance = starting_balance;
        let mut balance_updates = Vec::new();

        for transaction in &transactions {
            running_balance += transaction.amount;
            balance_updates.push((transaction.id.clone(), running_balance));
        }

        self.transaction_repository
            .update_transaction_balances(register_id, &balance_updates)?;

        info!("Successfully recalculated {} entry balances", balance_updates.len());
        Ok(balance_updates.len())
    }

    /// Calculate the starting balance for a recalculation.
    /// This is the balance just before the specified date.
    fn calculate_starting_balance(&self, register_id: &str, from_date: &str) -> Result<f64> {
        match self
            .transaction_repository
            .get_latest_transaction_before_date(register_id, from_date)?
        {
            Some(transaction) => Ok(transaction.balance),
            None => Ok(0.0),
        }
    }

    /// Calculate the correct balance for a new entry at a specific date.
    /// The previous entry's running balance already accumulates everything
    /// before this timestamp, so the new balance is just that plus the amount.
    pub fn calculate_balance_for_new_transaction(
        &self,
        register_id: &str,
        transaction_date: &str,
        transaction_amount: f64,
    ) -> Result<f64> {
        let base_balance = match self
            .transaction_repository
            .get_latest_transaction_before_date(register_id, transaction_date)?
        {
            Some(transaction) => transaction.balance,
            None => 0.0,
        };

        Ok(base_balance + transaction_amount)
    }

    /// Check if inserting an entry at a specific date would require balance
    /// recalculation. Returns true if there are any entries after that date.
    pub fn requires_balance_recalculation(
        &self,
        register_id: &str,
        transaction_date: &str,
    ) -> Result<bool> {
        let transactions_after = self
            .transaction_repository
            .get_transactions_since(register_id, transaction_date)?;

        let needs_recalc = transactions_after
            .iter()
            .any(|tx| Self::is_after(&tx.date, transaction_date));

        Ok(needs_recalc)
    }

    /// Validate that all running balances are correct for a register.
    /// This is a diagnostic method to ensure ledger integrity.
    pub fn validate_all_balances(&self, register_id: &str) -> Result<Vec<String>> {
        info!("Validating all balances for register {}", register_id);

        let transactions = self
            .transaction_repository
            .list_transactions_chronological(register_id, None, None)?;

        let mut errors = Vec::new();
        let mut expected_balance = 0.0;

        for transaction in transactions {
            expected_balance += transaction.amount;

            if (transaction.balance - expected_balance).abs() > 0.001 {
                let error = format!(
                    "Entry {} has incorrect balance: expected {:.2}, actual {:.2}",
                    transaction.id, expected_balance, transaction.balance
                );
                warn!("Balance validation error: {}", error);
                errors.push(error);
            }
        }

        if !errors.is_empty() {
            warn!("Found {} balance errors for register {}", errors.len(), register_id);
        }

        Ok(errors)
    }

    /// Strictly-after comparison between a stored date and a query date string
    fn is_after(tx_date: &DateTime<FixedOffset>, date: &str) -> bool {
        match DateTime::parse_from_rfc3339(date) {
            Ok(parsed) => *tx_date > parsed,
            Err(_) => tx_date.to_rfc3339().as_str() > date,
        }
    }
}
