//! Offline result files: one session's round results, exported by a scoring
//! client and fed to session finalization.

pub mod models;
pub mod validator;

pub use models::ResultsFile;
pub use validator::{ResultsValidator, ValidationReport};
