pub mod binding_table;
pub mod callback;
pub mod dispatcher;
pub mod error;
pub mod override_registry;
