mod error;
mod escrow;
mod helpers;
mod schema;
mod store;

pub use error::*;
pub use escrow::*;
pub use helpers::*;
pub use schema::*;
pub use store::*;
