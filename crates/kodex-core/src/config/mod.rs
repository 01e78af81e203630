//! Configuration for the design core, the chatbot and the booking demo
//!
//! Configuration is a single YAML document. Missing sections fall back to
//! defaults; the Gateway API key is resolved from the environment when the
//! file does not carry one.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::KodexError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<KodexConfig, KodexError> {
    ConfigLoader::from_file(path).await
}
