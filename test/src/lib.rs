
pub use helpers::*;
