pub mod pack_context;
pub mod tick_params;
