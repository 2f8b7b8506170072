use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractStatus, EscrowId, TenantId, UnitId};

#[derive(Error, Debug)]
pub enum RentError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("invalid range: {message}")]
    InvalidRange {
        message: String,
    },

    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
    },

    #[error("active contract already exists for tenant {tenant} on unit {unit}")]
    DuplicateContract {
        tenant: TenantId,
        unit: UnitId,
    },

    #[error("contract not active: current status is {status:?}")]
    NotActive {
        status: ContractStatus,
    },

    #[error("amount mismatch: expected {expected}, received {received}")]
    AmountMismatch {
        expected: Money,
        received: Money,
    },

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Money,
        requested: Money,
    },

    #[error("webhook signature verification failed")]
    Unauthorized,

    #[error("payment gateway unavailable: {message}")]
    GatewayUnavailable {
        message: String,
    },

    #[error("escrow balance already released: {id}")]
    EscrowAlreadyReleased {
        id: EscrowId,
    },
}

impl RentError {
    /// only gateway outages are safe to retry; business-rule failures are
    /// terminal and retrying cannot change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, RentError::GatewayUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, RentError>;
