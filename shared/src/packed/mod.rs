pub mod change_list;
pub mod error;
pub mod packed_entity_data;
pub mod packed_writer;
