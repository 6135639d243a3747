//! Infrastructure error conversions
//!
//! Maps transport, auth and API failures onto [`agentdodo_domain::DodoError`]
//! for callers that only speak the domain error.

pub mod conversions;

pub use conversions::InfraError;
