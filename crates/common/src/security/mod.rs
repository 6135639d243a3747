//! Secret storage
//!
//! [`SecretStore`] is the seam every credential consumer goes through. Two
//! backends ship with the crate:
//!
//! - [`KeychainProvider`] (feature `platform`): the OS keychain via `keyring`
//! - [`InMemorySecretStore`]: process-local storage for ephemeral sessions and
//!   tests

#[cfg(feature = "platform")]
pub mod keychain;
pub mod memory;
pub mod secret_store;

#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
pub use memory::InMemorySecretStore;
pub use secret_store::{replace_entries, SecretKey, SecretStore, StorageError};
