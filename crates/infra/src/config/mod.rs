//! Configuration loading
//!
//! Reads [`agentdodo_domain::Config`] from a file and `AGENTDODO_*`
//! environment variables.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths, CONFIG_PATH_VAR};
