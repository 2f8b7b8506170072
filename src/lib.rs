pub mod config;
pub mod contracts;
pub mod decimal;
pub mod directory;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod gateway;
pub mod payments;
pub mod router;
pub mod types;
pub mod wallet;
pub mod webhook;

// re-export key types
pub use config::RentConfig;
pub use contracts::{
    Contract, ContractManager, ContractStore, ContractUpdate, ExistingTenantTerms, NewTenantTerms,
};
pub use decimal::Money;
pub use directory::{InMemoryDirectory, PartyDirectory};
pub use errors::{RentError, Result};
pub use escrow::{EscrowAccumulator, EscrowBalance};
pub use events::{Event, EventStore};
pub use gateway::{
    ChargeInit, ChargeStatus, ChargeVerification, PaymentGateway, TransferReceipt,
    WebhookSignature,
};
pub use payments::{due_status, Payment, PaymentStore, SettleOutcome};
pub use router::{
    InitializedPayment, PaymentOutcome, PaymentRouter, UpcomingPayment, WithdrawalReceipt,
};
pub use types::{
    ContractId, ContractStatus, DueStatus, EscrowId, LandlordId, Page, PaymentId, PaymentStatus,
    PayoutType, PropertyId, TenantId, TransactionId, TransactionStatus, TransactionType, UnitId,
};
pub use wallet::{WalletBalance, WalletLedger, WalletTransaction};
pub use webhook::{WebhookAck, WebhookGate};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
