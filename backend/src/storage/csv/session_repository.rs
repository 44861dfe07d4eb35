//! # CSV Session Repository
//!
//! File-based session storage using per-register CSV files. Each register's
//! open/close history is stored in `{register_directory}/sessions.csv`.
//!
//! ## CSV Format
//!
//! ```csv
//! id,register_id,opening_balance,opened_by,opened_at,state,counted_total,expected_total,difference,notes,closed_by,closed_at
//! session::register::1_1737370800000,register::1,120.0,ana,2025-01-20T09:00:00Z,open,,,,,,
//! ```
//!
//! The count and closing columns stay empty while a session is open; state
//! transitions rewrite the file atomically via a temp file.

use anyhow::Result;
use csv::{Reader, Writer};
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::sync::Arc;

use super::connection::CsvConnection;
use super::register_repository::RegisterRepository;
use crate::domain::models::session::{RegisterSession, SessionState};
use crate::storage::traits::SessionStorage;

/// CSV-based session repository using per-register CSV files
#[derive(Clone)]
pub struct SessionRepository {
    connection: CsvConnection,
    register_repository: RegisterRepository,
}

impl SessionRepository {
    /// Create a new CSV session repository
    pub fn new(connection: CsvConnection) -> Self {
        let register_repository = RegisterRepository::new(Arc::new(connection.clone()));
        Self {
            connection,
            register_repository,
        }
    }

    /// Find the directory for the register owning the sessions
    fn get_register_directory_name(&self, register_id: &str) -> Result<String> {
        self.register_repository
            .find_register_directory(register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", register_id))
    }

    fn parse_optional_f64(field: &str) -> Option<f64> {
        if field.is_empty() {
            None
        } else {
            field.parse::<f64>().ok()
        }
    }

    fn parse_optional_string(field: &str) -> Option<String> {
        if field.is_empty() {
            None
        } else {
            Some(field.to_string())
        }
    }

    fn format_optional_f64(value: &Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    /// Read all sessions for a register from its CSV file
    fn read_sessions(&self, register_directory: &str) -> Result<Vec<RegisterSession>> {
        self.connection.ensure_sessions_file_exists(register_directory)?;

        let file_path = self.connection.get_sessions_file_path(register_directory);
        let file = File::open(&file_path)?;
        let reader = BufReader::new(file);
        let mut csv_reader = Reader::from_reader(reader);

        let mut sessions = Vec::new();

        for result in csv_reader.records() {
            let record = result?;

            let state = match SessionState::from_string(record.get(5).unwrap_or("open")) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Failed to parse session state: {}. Skipping record.", e);
                    continue;
                }
            };

            let session = RegisterSession {
                id: record.get(0).unwrap_or("").to_string(),
                register_id: record.get(1).unwrap_or("").to_string(),
                opening_balance: record.get(2).unwrap_or("0").parse::<f64>().unwrap_or(0.0),
                opened_by: record.get(3).unwrap_or("").to_string(),
                opened_at: record.get(4).unwrap_or("").to_string(),
                state,
                counted_total: Self::parse_optional_f64(record.get(6).unwrap_or("")),
                expected_total: Self::parse_optional_f64(record.get(7).unwrap_or("")),
                difference: Self::parse_optional_f64(record.get(8).unwrap_or("")),
                notes: Self::parse_optional_string(record.get(9).unwrap_or("")),
                closed_by: Self::parse_optional_string(record.get(10).unwrap_or("")),
                closed_at: Self::parse_optional_string(record.get(11).unwrap_or("")),
            };

            sessions.push(session);
        }

        Ok(sessions)
    }

    /// Write all sessions for a register to its CSV file (atomic rewrite)
    fn write_sessions(&self, register_directory: &str, sessions: &[RegisterSession]) -> Result<()> {
        let file_path = self.connection.get_sessions_file_path(register_directory);
        let temp_file_path = file_path.with_extension("csv.tmp");

        {
            let temp_file = File::create(&temp_file_path)?;
            let writer = BufWriter::new(temp_file);
            let mut csv_writer = Writer::from_writer(writer);

            csv_writer.write_record([
                "id",
                "register_id",
                "opening_balance",
                "opened_by",
                "opened_at",
                "state",
                "counted_total",
                "expected_total",
                "difference",
                "notes",
                "closed_by",
                "closed_at",
            ])?;

            for session in sessions {
                self.write_session_record(&mut csv_writer, session)?;
            }

            csv_writer.flush()?;
        }

        // Atomically replace the original file
        std::fs::rename(&temp_file_path, &file_path)?;

        debug!(
            "Successfully wrote {} sessions to {:?}",
            sessions.len(),
            file_path
        );
        Ok(())
    }

    fn write_session_record<W: std::io::Write>(
        &self,
        csv_writer: &mut Writer<W>,
        session: &RegisterSession,
    ) -> Result<()> {
        let opening_balance = session.opening_balance.to_string();
        let state = session.state.to_string();
        let counted_total = Self::format_optional_f64(&session.counted_total);
        let expected_total = Self::format_optional_f64(&session.expected_total);
        let difference = Self::format_optional_f64(&session.difference);
        csv_writer.write_record([
            session.id.as_str(),
            session.register_id.as_str(),
            opening_balance.as_str(),
            session.opened_by.as_str(),
            session.opened_at.as_str(),
            state.as_str(),
            counted_total.as_str(),
            expected_total.as_str(),
            difference.as_str(),
            session.notes.as_deref().unwrap_or(""),
            session.closed_by.as_deref().unwrap_or(""),
            session.closed_at.as_deref().unwrap_or(""),
        ])?;
        Ok(())
    }

    /// Append a new session to the CSV file
    fn append_session(&self, register_directory: &str, session: &RegisterSession) -> Result<()> {
        self.connection.ensure_sessions_file_exists(register_directory)?;

        let file_path = self.connection.get_sessions_file_path(register_directory);
        let file = OpenOptions::new().append(true).open(&file_path)?;

        let mut csv_writer = Writer::from_writer(file);
        // No header when appending to an existing file
        self.write_session_record(&mut csv_writer, session)?;
        csv_writer.flush()?;

        debug!("Successfully appended session {} to {:?}", session.id, file_path);
        Ok(())
    }
}

impl SessionStorage for SessionRepository {
    fn store_session(&self, session: &RegisterSession) -> Result<()> {
        let directory_name = self.get_register_directory_name(&session.register_id)?;
        self.append_session(&directory_name, session)?;
        info!("Stored session {} for register {}", session.id, session.register_id);
        Ok(())
    }

    fn get_open_session(&self, register_id: &str) -> Result<Option<RegisterSession>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let sessions = self.read_sessions(&directory_name)?;

        Ok(sessions
            .into_iter()
            .filter(|s| s.state == SessionState::Open)
            .max_by(|a, b| a.opened_at.cmp(&b.opened_at)))
    }

    fn get_session(&self, register_id: &str, session_id: &str) -> Result<Option<RegisterSession>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let sessions = self.read_sessions(&directory_name)?;
        Ok(sessions.into_iter().find(|s| s.id == session_id))
    }

    fn list_sessions(&self, register_id: &str, limit: Option<u32>) -> Result<Vec<RegisterSession>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let mut sessions = self.read_sessions(&directory_name)?;

        // Most recent first
        sessions.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));

        if let Some(limit) = limit {
            sessions.truncate(limit as usize);
        }

        Ok(sessions)
    }

    fn update_session(&self, session: &RegisterSession) -> Result<()> {
        let directory_name = self.get_register_directory_name(&session.register_id)?;
        let mut sessions = self.read_sessions(&directory_name)?;

        let position = sessions
            .iter()
            .position(|s| s.id == session.id)
            .ok_or_else(|| anyhow::anyhow!("Session not found: {}", session.id))?;

        sessions[position] = session.clone();
        self.write_sessions(&directory_name, &sessions)
    }

    fn has_open_session(&self, register_id: &str) -> Result<bool> {
        Ok(self.get_open_session(register_id)?.is_some())
    }

    fn get_latest_closed_session(&self, register_id: &str) -> Result<Option<RegisterSession>> {
        let directory_name = self.get_register_directory_name(register_id)?;
        let sessions = self.read_sessions(&directory_name)?;

        Ok(sessions
            .into_iter()
            .filter(|s| s.state == SessionState::Closed)
            .max_by(|a, b| a.opened_at.cmp(&b.opened_at)))
    }
}
