use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::domain::commands::registers::{
    CreateRegisterCommand, CreateRegisterResult, DeleteRegisterCommand, DeleteRegisterResult,
    GetActiveRegisterResult, GetRegisterCommand, GetRegisterResult, ListRegistersResult,
    SetActiveRegisterCommand, SetActiveRegisterResult, UpdateRegisterCommand, UpdateRegisterResult,
};
use crate::domain::models::register::{ActiveRegister, Register as DomainRegister};
use crate::storage::csv::{CsvConnection, RegisterRepository};
use crate::storage::traits::RegisterStorage;

/// Service for managing the petty-cash registers of the institute
#[derive(Clone)]
pub struct RegisterService {
    register_repository: RegisterRepository,
}

impl RegisterService {
    /// Create a new RegisterService
    pub fn new(csv_conn: Arc<CsvConnection>) -> Self {
        let register_repository = RegisterRepository::new(csv_conn);
        Self { register_repository }
    }

    /// Create a new register
    pub fn create_register(&self, command: CreateRegisterCommand) -> Result<CreateRegisterResult> {
        info!("Creating register: name={}, location={}", command.name, command.location);

        self.validate_create_command(&command)?;

        // Directory names are derived from register names, so two registers
        // must not collapse to the same directory.
        let directory_name = RegisterRepository::generate_safe_directory_name(&command.name);
        for existing in self.register_repository.list_registers()? {
            if RegisterRepository::generate_safe_directory_name(&existing.name) == directory_name {
                return Err(anyhow::anyhow!(
                    "A register with a similar name already exists: {}",
                    existing.name
                ));
            }
        }

        let now = Utc::now();
        let register = DomainRegister {
            id: DomainRegister::generate_id(now.timestamp_millis() as u64),
            name: command.name.trim().to_string(),
            location: command.location.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        self.register_repository.store_register(&register)?;

        info!("Created register: {} with ID: {}", register.name, register.id);

        Ok(CreateRegisterResult { register })
    }

    /// Get a register by ID
    pub fn get_register(&self, command: GetRegisterCommand) -> Result<GetRegisterResult> {
        debug!("Getting register: {}", command.register_id);

        let register = self.register_repository.get_register(&command.register_id)?;

        if register.is_none() {
            warn!("Register not found: {}", command.register_id);
        }

        Ok(GetRegisterResult { register })
    }

    /// List all registers
    pub fn list_registers(&self) -> Result<ListRegistersResult> {
        let registers = self.register_repository.list_registers()?;

        debug!("Found {} registers", registers.len());

        Ok(ListRegistersResult { registers })
    }

    /// Update an existing register
    pub fn update_register(&self, command: UpdateRegisterCommand) -> Result<UpdateRegisterResult> {
        info!("Updating register: {}", command.register_id);

        let mut register = self
            .register_repository
            .get_register(&command.register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", command.register_id))?;

        if let Some(name) = command.name {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Register name cannot be empty"));
            }
            register.name = name.trim().to_string();
        }
        if let Some(location) = command.location {
            register.location = location.trim().to_string();
        }

        register.updated_at = Utc::now();

        self.register_repository.update_register(&register)?;

        info!("Updated register: {} with ID: {}", register.name, register.id);

        Ok(UpdateRegisterResult { register })
    }

    /// Delete a register
    pub fn delete_register(&self, command: DeleteRegisterCommand) -> Result<DeleteRegisterResult> {
        info!("Deleting register: {}", command.register_id);

        let register = self
            .register_repository
            .get_register(&command.register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", command.register_id))?;

        self.register_repository.delete_register(&command.register_id)?;

        info!("Deleted register: {} with ID: {}", register.name, register.id);

        Ok(DeleteRegisterResult {
            success_message: format!("Register '{}' deleted successfully", register.name),
        })
    }

    /// Get the currently active register
    pub fn get_active_register(&self) -> Result<GetActiveRegisterResult> {
        debug!("Getting active register");

        let active_register_id = self.register_repository.get_active_register()?;

        let active_register_model = if let Some(register_id) = active_register_id {
            match self.register_repository.get_register(&register_id)? {
                Some(register) => Some(register),
                None => {
                    warn!("Active register ID exists but register not found: {}", register_id);
                    None
                }
            }
        } else {
            debug!("No active register set");
            None
        };

        Ok(GetActiveRegisterResult {
            active_register: ActiveRegister {
                register: active_register_model,
            },
        })
    }

    /// Set the active register
    pub fn set_active_register(
        &self,
        command: SetActiveRegisterCommand,
    ) -> Result<SetActiveRegisterResult> {
        info!("Setting active register: {}", command.register_id);

        let register = self
            .register_repository
            .get_register(&command.register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", command.register_id))?;

        self.register_repository.set_active_register(&command.register_id)?;

        info!("Successfully set active register: {} ({})", register.name, register.id);

        Ok(SetActiveRegisterResult { register })
    }

    /// Resolve an optional register ID to a register, falling back to the
    /// active register. Used by the ledger and session workflows.
    pub fn resolve_register(&self, register_id: Option<&str>) -> Result<DomainRegister> {
        match register_id {
            Some(id) => self
                .register_repository
                .get_register(id)?
                .ok_or_else(|| anyhow::anyhow!("Register not found: {}", id)),
            None => self
                .get_active_register()?
                .active_register
                .register
                .ok_or_else(|| anyhow::anyhow!("No active register set")),
        }
    }

    /// Validate create register command
    fn validate_create_command(&self, command: &CreateRegisterCommand) -> Result<()> {
        if command.name.trim().is_empty() {
            return Err(anyhow::anyhow!("Register name cannot be empty"));
        }
        if command.name.len() > 128 {
            return Err(anyhow::anyhow!("Register name cannot exceed 128 characters"));
        }
        if command.location.trim().is_empty() {
            return Err(anyhow::anyhow!("Register location cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (RegisterService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        (RegisterService::new(connection), temp_dir)
    }

    #[test]
    fn test_create_and_get_register() {
        let (service, _temp_dir) = create_test_service();

        let result = service
            .create_register(CreateRegisterCommand {
                name: "Front Desk".to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();

        let fetched = service
            .get_register(GetRegisterCommand {
                register_id: result.register.id.clone(),
            })
            .unwrap();

        assert_eq!(fetched.register.unwrap().name, "Front Desk");
    }

    #[test]
    fn test_create_register_validates_name() {
        let (service, _temp_dir) = create_test_service();

        let result = service.create_register(CreateRegisterCommand {
            name: "   ".to_string(),
            location: "Main building".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_create_register_rejects_colliding_names() {
        let (service, _temp_dir) = create_test_service();

        service
            .create_register(CreateRegisterCommand {
                name: "Front Desk".to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();

        // Same directory name after sanitizing
        let result = service.create_register(CreateRegisterCommand {
            name: "front desk".to_string(),
            location: "Annex".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_active_register_workflow() {
        let (service, _temp_dir) = create_test_service();

        // No active register initially
        let active = service.get_active_register().unwrap();
        assert!(active.active_register.register.is_none());

        let created = service
            .create_register(CreateRegisterCommand {
                name: "Front Desk".to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();

        service
            .set_active_register(SetActiveRegisterCommand {
                register_id: created.register.id.clone(),
            })
            .unwrap();

        let active = service.get_active_register().unwrap();
        assert_eq!(active.active_register.register.unwrap().id, created.register.id);

        // resolve_register falls back to the active register
        let resolved = service.resolve_register(None).unwrap();
        assert_eq!(resolved.id, created.register.id);
    }

    #[test]
    fn test_resolve_register_without_active_fails() {
        let (service, _temp_dir) = create_test_service();
        assert!(service.resolve_register(None).is_err());
    }

    #[test]
    fn test_update_register() {
        let (service, _temp_dir) = create_test_service();

        let created = service
            .create_register(CreateRegisterCommand {
                name: "Front Desk".to_string(),
                location: "Main building".to_string(),
            })
            .unwrap();

        let updated = service
            .update_register(UpdateRegisterCommand {
                register_id: created.register.id.clone(),
                name: None,
                location: Some("Annex".to_string()),
            })
            .unwrap();

        assert_eq!(updated.register.location, "Annex");
        assert_eq!(updated.register.name, "Front Desk");
    }
}
