mod filter;
mod operand;
mod ops;
mod ordered;

pub use filter::*;
pub use operand::*;
pub use ops::*;
pub use ordered::*;
