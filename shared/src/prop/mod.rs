pub mod classifier;
pub mod error;
pub mod prop_kind;
pub mod send_prop;
pub mod send_table;
