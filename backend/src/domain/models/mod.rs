pub mod cash_count;
pub mod register;
pub mod session;
pub mod transaction;
