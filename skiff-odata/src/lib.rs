mod adapter;
mod auth;
mod batch;
mod response;
mod transport;
mod writer;

pub use adapter::*;
pub use auth::*;
pub use transport::*;
pub use writer::*;
