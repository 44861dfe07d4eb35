//! Commands and results for register management.

use crate::domain::models::register::{ActiveRegister, Register};

#[derive(Debug, Clone)]
pub struct CreateRegisterCommand {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct CreateRegisterResult {
    pub register: Register,
}

#[derive(Debug, Clone)]
pub struct GetRegisterCommand {
    pub register_id: String,
}

#[derive(Debug, Clone)]
pub struct GetRegisterResult {
    pub register: Option<Register>,
}

#[derive(Debug, Clone)]
pub struct UpdateRegisterCommand {
    pub register_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateRegisterResult {
    pub register: Register,
}

#[derive(Debug, Clone)]
pub struct DeleteRegisterCommand {
    pub register_id: String,
}

#[derive(Debug, Clone)]
pub struct DeleteRegisterResult {
    pub success_message: String,
}

#[derive(Debug, Clone)]
pub struct ListRegistersResult {
    pub registers: Vec<Register>,
}

#[derive(Debug, Clone)]
pub struct SetActiveRegisterCommand {
    pub register_id: String,
}

#[derive(Debug, Clone)]
pub struct SetActiveRegisterResult {
    pub register: Register,
}

#[derive(Debug, Clone)]
pub struct GetActiveRegisterResult {
    pub active_register: ActiveRegister,
}
