mod context;
mod query_writer;

pub use context::*;
pub use query_writer::*;
