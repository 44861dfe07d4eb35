pub mod csv;
pub mod traits;

pub use traits::{Connection, RegisterStorage, SessionStorage, TransactionStorage};
