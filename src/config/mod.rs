//! Configuration loading, types, and validation
//!
//! Configuration is TOML-based. The file is hashed (SHA-256) so that a
//! recovered crawl can detect that it is resuming under a different
//! configuration than the one it was checkpointed with.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    BudgetSettings, Config, FrontierSettings, PolitenessSettings, StorageSettings,
};
pub use validation::validate;
