//! Conversions from infrastructure errors into domain errors.

use agentdodo_common::auth::{AuthError, TokenManagerError};
use agentdodo_common::security::StorageError;
use agentdodo_domain::DodoError;

use crate::api::ApiError;
use crate::http::TransportError;
use crate::x::XError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DodoError);

impl From<InfraError> for DodoError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DodoError> for InfraError {
    fn from(value: DodoError) -> Self {
        InfraError(value)
    }
}

trait IntoDodoError {
    fn into_dodo(self) -> DodoError;
}

/* -------------------------------------------------------------------------- */
/* ApiError → DodoError */
/* -------------------------------------------------------------------------- */

impl IntoDodoError for ApiError {
    fn into_dodo(self) -> DodoError {
        let message = self.to_string();
        match self {
            ApiError::NotConfigured | ApiError::Unauthorized => DodoError::Auth(message),
            ApiError::Signature(_) => DodoError::Security(message),
            ApiError::Http { status: 404, .. } => DodoError::NotFound(message),
            ApiError::Http { .. } | ApiError::InvalidRequest(_) => DodoError::InvalidInput(message),
            ApiError::RateLimited { .. }
            | ApiError::Server { .. }
            | ApiError::Timeout(_)
            | ApiError::Network(_) => DodoError::Network(message),
            ApiError::Storage(_) => DodoError::Security(message),
            ApiError::Cancelled | ApiError::Decoding(_) => DodoError::Internal(message),
        }
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        InfraError(value.into_dodo())
    }
}

/* -------------------------------------------------------------------------- */
/* TransportError → DodoError */
/* -------------------------------------------------------------------------- */

impl From<TransportError> for InfraError {
    fn from(value: TransportError) -> Self {
        InfraError(ApiError::from(value).into_dodo())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError / AuthError → DodoError */
/* -------------------------------------------------------------------------- */

impl IntoDodoError for StorageError {
    fn into_dodo(self) -> DodoError {
        DodoError::Security(format!("secure storage: {self}"))
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_dodo())
    }
}

impl IntoDodoError for AuthError {
    fn into_dodo(self) -> DodoError {
        match self {
            AuthError::Storage(e) | AuthError::Token(TokenManagerError::Storage(e)) => {
                e.into_dodo()
            }
            AuthError::Signature(e) => DodoError::Security(e.to_string()),
            AuthError::Unsupported(_) => DodoError::InvalidInput(self.to_string()),
            other => DodoError::Auth(other.to_string()),
        }
    }
}

impl From<AuthError> for InfraError {
    fn from(value: AuthError) -> Self {
        InfraError(value.into_dodo())
    }
}

/* -------------------------------------------------------------------------- */
/* XError → DodoError */
/* -------------------------------------------------------------------------- */

impl From<XError> for InfraError {
    fn from(value: XError) -> Self {
        InfraError(match value {
            XError::Auth(e) => e.into_dodo(),
            XError::Api(e) => e.into_dodo(),
            XError::Config(msg) => DodoError::Config(msg),
        })
    }
}

impl From<XError> for DodoError {
    fn from(value: XError) -> Self {
        InfraError::from(value).into()
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
