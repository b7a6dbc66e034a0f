mod pin;
mod transaction;

pub use pin::*;
pub use transaction::*;
