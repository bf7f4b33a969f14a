mod buffer_supply;
mod delta_writer;
mod diff;
mod encode;
mod switch;

pub use buffer_supply::BufferSupplyInterceptor;
pub use delta_writer::DeltaWriter;
pub use diff::DiffInterceptor;
pub use encode::EncodeInterceptor;
pub use switch::InterceptorSwitch;
