use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a tenant
pub type TenantId = Uuid;
/// unique identifier for a landlord
pub type LandlordId = Uuid;
/// unique identifier for a property
pub type PropertyId = Uuid;
/// unique identifier for a unit within a property
pub type UnitId = Uuid;
/// unique identifier for a rent contract
pub type ContractId = Uuid;
/// unique identifier for a payment record
pub type PaymentId = Uuid;
/// unique identifier for an escrow balance
pub type EscrowId = Uuid;
/// unique identifier for a wallet transaction
pub type TransactionId = Uuid;

/// how collected rent reaches the landlord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutType {
    /// each payment credits the landlord wallet as soon as it is collected
    Immediate,
    /// payments accumulate in escrow and release as a lump sum
    Deferred,
}

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    /// created but not yet in force
    Pending,
    /// obligation running, payments accepted
    Active,
    /// lease end passed; retained for audit
    Expired,
    /// explicitly ended; retained for audit
    Terminated,
}

impl ContractStatus {
    /// expired and terminated are absorbing states
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Expired | ContractStatus::Terminated)
    }
}

/// payment record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// charge initialized, verification not yet received
    Pending,
    /// verified and routed; immutable from here
    Paid,
    /// missed or auto-expired
    Overdue,
    /// collected below the obligation amount
    Partial,
}

/// classification of a due date relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueStatus {
    Upcoming,
    Due,
    Overdue,
}

/// wallet transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Credit,
    Debit,
    Withdrawal,
    Refund,
}

impl TransactionType {
    /// whether this entry increases the available balance
    pub fn is_inflow(&self) -> bool {
        matches!(self, TransactionType::Credit | TransactionType::Refund)
    }
}

/// wallet transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Completed,
    Reversed,
}

/// pagination window for history reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}
