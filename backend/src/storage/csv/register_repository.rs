//! # CSV Register Repository
//!
//! File-based register storage using filesystem discovery. Each register
//! lives in its own directory under the data root:
//!
//! ```text
//! data/
//! ├── global_config.yaml    ← active register pointer
//! └── {register_name}/
//!     ├── register.yaml     ← this module manages these files
//!     ├── transactions.csv
//!     └── sessions.csv
//! ```

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::connection::CsvConnection;
use crate::domain::models::register::Register as DomainRegister;
use crate::storage::traits::RegisterStorage;

/// Intermediate struct for YAML serialization with string date fields
#[derive(Debug, Clone, Serialize, Deserialize)]
struct YamlRegister {
    id: String,
    name: String,
    location: String,
    created_at: String,
    updated_at: String,
}

/// Global configuration stored as a single YAML file at the data root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory name of the currently active register (None if none selected)
    pub active_register_directory: Option<String>,
    /// Data format version for future migrations
    pub data_format_version: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            active_register_directory: None,
            data_format_version: "1.0".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// CSV-based register repository using filesystem discovery
#[derive(Clone)]
pub struct RegisterRepository {
    connection: Arc<CsvConnection>,
}

impl RegisterRepository {
    /// Create a new CSV register repository
    pub fn new(connection: Arc<CsvConnection>) -> Self {
        Self { connection }
    }

    /// Generate a safe filesystem identifier from a register name.
    /// Converts "Front Desk" -> "front_desk", "Café Bar" -> "cafe_bar", etc.
    pub fn generate_safe_directory_name(register_name: &str) -> String {
        let result = register_name
            .chars()
            .map(|c| {
                if c.is_whitespace() {
                    '_'
                } else {
                    match c {
                        'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
                        'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
                        'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
                        'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
                        'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
                        'ñ' | 'Ñ' => 'n',
                        'ç' | 'Ç' => 'c',
                        c if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
                        _ => '_',
                    }
                }
            })
            .collect::<String>();

        // Collapse consecutive underscores into single underscores
        let mut collapsed = String::new();
        let mut last_was_underscore = false;

        for c in result.chars() {
            if c == '_' {
                if !last_was_underscore {
                    collapsed.push('_');
                }
                last_was_underscore = true;
            } else {
                collapsed.push(c);
                last_was_underscore = false;
            }
        }

        collapsed.trim_matches('_').to_string()
    }

    /// Get the path to a register's YAML metadata file
    fn get_register_yaml_path(&self, directory_name: &str) -> PathBuf {
        self.connection
            .get_register_directory(directory_name)
            .join("register.yaml")
    }

    /// Get the path to the global configuration file
    fn get_global_config_path(&self) -> PathBuf {
        self.connection.base_directory().join("global_config.yaml")
    }

    /// Discover all registers by scanning directories
    fn discover_registers(&self) -> Result<Vec<DomainRegister>> {
        let base_dir = self.connection.base_directory();

        if !base_dir.exists() {
            debug!("Base directory doesn't exist, returning empty register list");
            return Ok(Vec::new());
        }

        let mut registers = Vec::new();

        for entry in fs::read_dir(base_dir)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => {
                    warn!("Skipping directory with invalid name: {:?}", path);
                    continue;
                }
            };

            match self.load_register_from_directory(dir_name) {
                Ok(Some(register)) => {
                    debug!("Discovered register: {} from directory: {}", register.name, dir_name);
                    registers.push(register);
                }
                Ok(None) => {
                    debug!("Directory {} doesn't contain a valid register", dir_name);
                }
                Err(e) => {
                    warn!("Error loading register from directory {}: {}", dir_name, e);
                }
            }
        }

        // Sort registers by name for consistent ordering
        registers.sort_by(|a, b| a.name.cmp(&b.name));

        debug!("Discovered {} registers", registers.len());
        Ok(registers)
    }

    /// Load a register from a specific directory
    fn load_register_from_directory(&self, directory_name: &str) -> Result<Option<DomainRegister>> {
        let yaml_path = self.get_register_yaml_path(directory_name);

        if !yaml_path.exists() {
            return Ok(None);
        }

        let yaml_content = fs::read_to_string(&yaml_path)?;
        let yaml_register: YamlRegister = serde_yaml::from_str(&yaml_content)?;

        let domain_register = DomainRegister {
            id: yaml_register.id,
            name: yaml_register.name,
            location: yaml_register.location,
            created_at: chrono::DateTime::parse_from_rfc3339(&yaml_register.created_at)
                .map_err(|e| anyhow::anyhow!("Failed to parse created_at: {}", e))?
                .with_timezone(&chrono::Utc),
            updated_at: chrono::DateTime::parse_from_rfc3339(&yaml_register.updated_at)
                .map_err(|e| anyhow::anyhow!("Failed to parse updated_at: {}", e))?
                .with_timezone(&chrono::Utc),
        };

        Ok(Some(domain_register))
    }

    /// Save a register to its directory
    fn save_register_to_directory(
        &self,
        register: &DomainRegister,
        directory_name: &str,
    ) -> Result<()> {
        let register_dir = self.connection.get_register_directory(directory_name);
        if !register_dir.exists() {
            fs::create_dir_all(&register_dir)?;
            info!("Created register directory: {:?}", register_dir);
        }

        let yaml_register = YamlRegister {
            id: register.id.clone(),
            name: register.name.clone(),
            location: register.location.clone(),
            created_at: register.created_at.to_rfc3339(),
            updated_at: register.updated_at.to_rfc3339(),
        };

        let yaml_path = self.get_register_yaml_path(directory_name);
        let yaml_content = serde_yaml::to_string(&yaml_register)?;

        // Atomic write using temp file
        let temp_path = yaml_path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &yaml_path)?;

        Ok(())
    }

    /// Find the directory name that contains the register with the given ID.
    /// The directory is matched by the stored metadata, not re-derived from
    /// the register name, so renamed registers keep resolving.
    pub fn find_register_directory(&self, register_id: &str) -> Result<Option<String>> {
        let base_dir = self.connection.base_directory();

        if !base_dir.exists() {
            return Ok(None);
        }

        for entry in fs::read_dir(base_dir)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }

            let dir_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            if let Ok(Some(register)) = self.load_register_from_directory(dir_name) {
                if register.id == register_id {
                    return Ok(Some(dir_name.to_string()));
                }
            }
        }

        Ok(None)
    }

    /// Load global config from file, creating the default if it doesn't exist
    fn load_or_create_global_config(&self) -> Result<GlobalConfig> {
        let config_path = self.get_global_config_path();

        if config_path.exists() {
            let yaml_content = fs::read_to_string(&config_path)?;
            let config: GlobalConfig = serde_yaml::from_str(&yaml_content)?;
            debug!("Loaded global config from {:?}", config_path);
            Ok(config)
        } else {
            let config = GlobalConfig::default();
            self.save_global_config(&config)?;
            info!("Created default global config at {:?}", config_path);
            Ok(config)
        }
    }

    /// Save global config to file
    fn save_global_config(&self, config: &GlobalConfig) -> Result<()> {
        let config_path = self.get_global_config_path();
        let base_dir = self.connection.base_directory();

        if !base_dir.exists() {
            fs::create_dir_all(&base_dir)?;
        }

        let yaml_content = serde_yaml::to_string(config)?;

        // Atomic write pattern: write to temp file, then rename
        let temp_path = config_path.with_extension("tmp");
        fs::write(&temp_path, yaml_content)?;
        fs::rename(&temp_path, &config_path)?;

        debug!("Saved global config to {:?}", config_path);
        Ok(())
    }
}

impl RegisterStorage for RegisterRepository {
    fn store_register(&self, register: &DomainRegister) -> Result<()> {
        let directory_name = Self::generate_safe_directory_name(&register.name);
        self.save_register_to_directory(register, &directory_name)?;
        self.connection.ensure_transactions_file_exists(&directory_name)?;
        self.connection.ensure_sessions_file_exists(&directory_name)?;
        info!("Stored register {} in directory {}", register.id, directory_name);
        Ok(())
    }

    fn get_register(&self, register_id: &str) -> Result<Option<DomainRegister>> {
        let registers = self.discover_registers()?;
        Ok(registers.into_iter().find(|r| r.id == register_id))
    }

    fn list_registers(&self) -> Result<Vec<DomainRegister>> {
        self.discover_registers()
    }

    fn update_register(&self, register: &DomainRegister) -> Result<()> {
        let directory_name = self
            .find_register_directory(&register.id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", register.id))?;
        self.save_register_to_directory(register, &directory_name)
    }

    fn delete_register(&self, register_id: &str) -> Result<()> {
        let directory_name = self
            .find_register_directory(register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", register_id))?;

        // Clear the active pointer if it references this register
        let mut config = self.load_or_create_global_config()?;
        if config.active_register_directory.as_deref() == Some(directory_name.as_str()) {
            config.active_register_directory = None;
            config.updated_at = Utc::now().to_rfc3339();
            self.save_global_config(&config)?;
        }

        let register_dir = self.connection.get_register_directory(&directory_name);
        if register_dir.exists() {
            fs::remove_dir_all(&register_dir)?;
        }

        info!("Deleted register {} (directory {})", register_id, directory_name);
        Ok(())
    }

    fn get_active_register(&self) -> Result<Option<String>> {
        let config = self.load_or_create_global_config()?;

        let directory_name = match config.active_register_directory {
            Some(name) => name,
            None => return Ok(None),
        };

        match self.load_register_from_directory(&directory_name)? {
            Some(register) => Ok(Some(register.id)),
            None => {
                warn!(
                    "Active register directory {} no longer contains a register",
                    directory_name
                );
                Ok(None)
            }
        }
    }

    fn set_active_register(&self, register_id: &str) -> Result<()> {
        let directory_name = self
            .find_register_directory(register_id)?
            .ok_or_else(|| anyhow::anyhow!("Register not found: {}", register_id))?;

        let mut config = self.load_or_create_global_config()?;
        config.active_register_directory = Some(directory_name);
        config.updated_at = Utc::now().to_rfc3339();
        self.save_global_config(&config)?;

        Ok(())
    }
}
