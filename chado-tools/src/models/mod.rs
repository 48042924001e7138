mod column;
mod table;
mod audit_table;
mod trigger;
mod privilege;
mod backup_function;

pub use column::*;
pub use table::*;
pub use audit_table::*;
pub use trigger::*;
pub use privilege::*;
pub use backup_function::*;
