pub mod error;
pub mod results;

pub use error::{AdminError, Result};
