pub mod error;

pub use error::{RequestError, VaultError};
