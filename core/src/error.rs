use thiserror::Error;
use tidepool_store::StoreError;

/// Coarse error classes for thin controllers that map errors to transport
/// codes without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input is malformed; recoverable by correcting it.
    Validation,
    /// A referenced entity does not exist off-chain at read time.
    NotFound,
    /// The operation would violate a state invariant.
    Conflict,
    /// The on-chain client call failed or timed out. Carries no guarantee
    /// about whether the corresponding off-chain mutation happened.
    OnChain,
    /// Storage-layer or data-integrity failure; propagated, never masked.
    Internal,
}

/// Error taxonomy for all core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("tank {tank_id} cannot admit {requested} more fish ({occupancy}/{capacity})")]
    TankFull {
        tank_id: i64,
        occupancy: u32,
        capacity: u32,
        requested: u32,
    },

    #[error("starter pack already granted to {address}")]
    StarterPackGranted { address: String },

    #[error("on-chain {op} failed: {source}")]
    OnChain {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("lineage walk from fish {root} exceeded {max} generations")]
    LineageDepthExceeded { root: i64, max: u32 },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn on_chain<E>(op: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::OnChain {
            op,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TankFull { .. } | Self::StarterPackGranted { .. } => ErrorKind::Conflict,
            Self::OnChain { .. } => ErrorKind::OnChain,
            Self::LineageDepthExceeded { .. } => ErrorKind::Internal,
            Self::Store(StoreError::NotFound) => ErrorKind::NotFound,
            Self::Store(StoreError::UniqueViolation) => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            Error::validation("address", "must not be empty").kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::not_found("player", "0xaa").kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::TankFull {
                tank_id: 1,
                occupancy: 10,
                capacity: 10,
                requested: 1
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::Store(StoreError::UniqueViolation).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::LineageDepthExceeded { root: 1, max: 50 }.kind(),
            ErrorKind::Internal
        );
    }
}
