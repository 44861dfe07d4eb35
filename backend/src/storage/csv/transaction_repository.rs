use anyhow::Result;
use csv::{Reader, Writer};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::sync::Arc;

use super::connection::CsvConnection;
use super::register_repository::RegisterRepository;
use crate::domain::models::transaction::{
    Transaction as DomainTransaction, TransactionType as DomainTransactionType,
};
use crate::storage::traits::TransactionStorage;

/// CSV-based transaction repository with one ledger file per register
#[derive(Clone)]
pub struct TransactionRepository {
    connection: CsvConnection,
    register_repository: RegisterRepository,
}

impl TransactionRepository {
    /// Create a new CSV transaction repository
    pub fn new(connection: CsvConnection) -> Self {
        let register_repository = RegisterRepository::new(Arc::new(connection.clone()));
        Self {
            connection,
            register_repository,
        }
    }

    /// Read all transactions for a register from its CSV file
    fn read_transactions(&self, register_directory: &str) -> Result<Vec<DomainTransaction>> {
        self.connection
            .ensure_transactions_file_exists(register_directory)?;

        let file_path = self.connection.get_transactions_file_path(register_directory);

        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut transactions = Vec::new();

        for result in csv_reader.records() {
            let record = result?;

            let date_str = record.get(2).unwrap_or("");
            let parsed_date = self.parse_date_string(date_str)?;

            let amount = record.get(4).unwrap_or("0").parse::<f64>().unwrap_or(0.0);

            // Entries written before the entry_type column existed fall back
            // to the sign of the amount.
            let entry_type = match record.get(6) {
                Some(s) if !s.is_empty() => DomainTransactionType::from_str(s)
                    .unwrap_or_else(|_| DomainTransactionType::from_amount(amount)),
                _ => DomainTransactionType::from_amount(amount),
            };

            let transaction = DomainTransaction {
                id: record.get(0).unwrap_or("").to_string(),
                register_id: record.get(1).unwrap_or("").to_string(),
                date: parsed_date,
                description: record.get(3).unwrap_or("").to_string(),
                amount,
                balance: record.get(5).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                entry_type,
            };

            transactions.push(transaction);
        }

        Ok(transactions)
    }

    /// Parse a stored date string into a DateTime object
    fn parse_date_string(&self, date_str: &str) -> Result<chrono::DateTime<chrono::FixedOffset>> {
        use chrono::{DateTime, FixedOffset, NaiveDate};

        // Try parsing as RFC 3339 first (the format we write)
        if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
            return Ok(dt);
        }

        // Try parsing as date-only format (YYYY-MM-DD)
        if let Ok(naive_date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            let naive_datetime = naive_date.and_hms_opt(0, 0, 0).unwrap();
            let utc_offset = FixedOffset::east_opt(0).unwrap();

            if let Some(dt) = naive_datetime.and_local_timezone(utc_offset).single() {
                return Ok(dt);
            }
        }

        // If all parsing fails, return current time as fallback
        warn!("Failed to parse date '{}', using current time as fallback", date_str);
        Ok(chrono::Utc::now().with_timezone(&chrono::FixedOffset::east_opt(0).unwrap()))
    }

    /// Write all transactions for a register to its CSV file
    fn write_transactions(
        &self,
        register_directory: &str,
        transactions: &[DomainTransaction],
    ) -> Result<()> {
        let file_path = self.connection.get_transactions_file_path(register_directory);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)?;

        let writer = BufWriter::new(file);
        let mut csv_writer = Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "register_id",
            "date",
            "description",
            "amount",
            "balance",
            "entry_type",
        ])?;

        for transaction in transactions {
            let date = transaction.date.to_rfc3339();
            let amount = transaction.amount.to_string();
            let balance = transaction.balance.to_string();
            csv_writer.write_record([
                transaction.id.as_str(),
                transaction.register_id.as_str(),
                date.as_str(),
                transaction.description.as_str(),
                amount.as_str(),
                balance.as_str(),
                transaction.entry_type.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Helper method to get a register directory name from a register ID
    fn get_register_directory_name(&self, register_id: &str) -> Result<String> {
        match self.register_repository.find_register_directory(register_id)? {
            Some(directory_name) => Ok(directory_name),
            None => {
                // Register not found - this shouldn't happen in normal operation
                warn!(
                    "Register not found for ID: {}. Using fallback directory name.",
                    register_id
                );
                Ok(format!(
                    "unknown_register_{}",
                    register_id
                        .chars()
                        .filter(|c| c.is_alphanumeric())
                        .take(10)
                        .collect::<String>()
                        .to_lowercase()
                ))
            }
        }
    }

    /// Compare a stored DateTime against a query date string, handling
    /// timezone conversion
    fn compare_dates(&self, date1: &chrono::DateTime<chrono::FixedOffset>, date2: &str) -> i32 {
        if let Ok(dt2) = chrono::DateTime::parse_from_rfc3339(date2) {
            if *date1 < dt2 {
                -1
            } else if *date1 > dt2 {
                1
            } else {
                0
            }
        } else {
            // If parsing fails, compare against the RFC 3339 representation
            let date1_str = date1.to_rfc3339();
            match date1_str.as_str().cmp(date2) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Greater => 1,
                std::cmp::Ordering::Equal => 0,
            }
        }
    }
}

impl TransactionStorage for TransactionRepository {
    fn store_transaction(&self, transaction: &DomainTransaction) -> Result<()> {
        let directory_name = self.get_register_directory_name(&transaction.register_id)?;
        info!(
            "Storing transaction in CSV for register '{}': {}",
            directory_name, transaction.id
        );

        let mut transactions = self.read_transactions(&directory_name)?;
        transactions.push(transaction.clone());

        // Sort by date to maintain chronological order
        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        self.write_transactions(&directory_name, &transactions)?;

        Ok(())
    }

    fn get_transaction(
        &self,
        register_id: &str,
        transaction_id: &str,
    ) -> Result<Option<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let transactions = self.read_transactions(&directory_name)?;
        Ok(transactions.into_iter().find(|tx| tx.id == transaction_id))
    }

    fn list_transactions(
        &self,
        register_id: &str,
        limit: Option<u32>,
        after: Option<String>,
    ) -> Result<Vec<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;

        // Most recent first
        transactions.sort_by(|a, b| b.date.cmp(&a.date));

        if let Some(after_id) = after {
            if let Some(idx) = transactions.iter().position(|tx| tx.id == after_id) {
                transactions = transactions.into_iter().skip(idx + 1).collect();
            }
        }

        if let Some(limit) = limit {
            transactions.truncate(limit as usize);
        }

        Ok(transactions)
    }

    fn list_transactions_chronological(
        &self,
        register_id: &str,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;

        if let Some(start) = start_date {
            transactions.retain(|tx| self.compare_dates(&tx.date, &start) >= 0);
        }
        if let Some(end) = end_date {
            transactions.retain(|tx| self.compare_dates(&tx.date, &end) <= 0);
        }

        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        Ok(transactions)
    }

    fn delete_transactions(&self, register_id: &str, transaction_ids: &[String]) -> Result<u32> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let transactions = self.read_transactions(&directory_name)?;

        let before = transactions.len();
        let remaining: Vec<DomainTransaction> = transactions
            .into_iter()
            .filter(|tx| !transaction_ids.contains(&tx.id))
            .collect();
        let deleted = (before - remaining.len()) as u32;

        if deleted > 0 {
            self.write_transactions(&directory_name, &remaining)?;
            info!(
                "Deleted {} transactions from register '{}'",
                deleted, directory_name
            );
        }

        Ok(deleted)
    }

    fn get_latest_transaction(&self, register_id: &str) -> Result<Option<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;
        transactions.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(transactions.pop())
    }

    fn get_transactions_since(
        &self,
        register_id: &str,
        date: &str,
    ) -> Result<Vec<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;

        transactions.retain(|tx| self.compare_dates(&tx.date, date) >= 0);
        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        Ok(transactions)
    }

    fn get_latest_transaction_before_date(
        &self,
        register_id: &str,
        date: &str,
    ) -> Result<Option<DomainTransaction>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;

        transactions.retain(|tx| self.compare_dates(&tx.date, date) < 0);
        transactions.sort_by(|a, b| a.date.cmp(&b.date));

        Ok(transactions.pop())
    }

    fn update_transaction_balances(
        &self,
        register_id: &str,
        updates: &[(String, f64)],
    ) -> Result<()> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut transactions = self.read_transactions(&directory_name)?;

        for transaction in transactions.iter_mut() {
            if let Some((_, new_balance)) = updates.iter().find(|(id, _)| *id == transaction.id) {
                transaction.balance = *new_balance;
            }
        }

        self.write_transactions(&directory_name, &transactions)
    }

    fn check_transactions_exist(
        &self,
        register_id: &str,
        transaction_ids: &[String],
    ) -> Result<Vec<String>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let transactions = self.read_transactions(&directory_name)?;

        Ok(transaction_ids
            .iter()
            .filter(|id| transactions.iter().any(|tx| tx.id == **id))
            .cloned()
            .collect())
    }
}
