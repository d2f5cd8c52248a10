use crate::gateway::GatewayError;
use crate::model::{EntityId, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure surfaced by store and statistics operations.
#[derive(Debug)]
pub enum StoreError {
    /// A mutation needs an active actor and none is signed in.
    NotAuthenticated,
    /// The id is not in the current snapshot.
    NotFound(EntityId),
    Validation(ValidationError),
    /// Opaque transport or remote-side failure.
    Gateway(GatewayError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no actor is signed in"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Gateway(err) => write!(f, "gateway failure: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Gateway(err) => Some(err),
            Self::NotAuthenticated | Self::NotFound(_) => None,
        }
    }
}

impl From<GatewayError> for StoreError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
