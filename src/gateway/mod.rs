//! Payment gateway adapter boundary.
//!
//! Everything crossing this boundary is in minor currency units (kobo,
//! cents); the core subsystem converts at the call site with
//! `Money::to_minor`/`Money::from_minor` and works in major-unit fixed
//! point everywhere else.

pub mod signature;

#[cfg(test)]
pub mod mock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use signature::WebhookSignature;

/// thin interface to the external card/transfer processor; no business
/// logic lives behind it
///
/// Implementations own their network timeouts and surface failures as
/// `GatewayUnavailable`, the only retryable error in the taxonomy.
pub trait PaymentGateway: Send + Sync {
    /// create a charge and return the redirect/authorization handle
    fn initialize_charge(
        &self,
        payer_email: &str,
        amount_minor: i64,
        reference: &str,
        metadata: &serde_json::Value,
    ) -> Result<ChargeInit>;

    /// look up the settled state of a charge by reference
    fn verify_charge(&self, reference: &str) -> Result<ChargeVerification>;

    /// push funds to a landlord's settlement handle
    fn initiate_transfer(
        &self,
        amount_minor: i64,
        recipient: &str,
        reason: &str,
    ) -> Result<TransferReceipt>;

    /// authenticate an inbound webhook body against its signature header
    fn verify_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool;
}

/// authorization handle returned by charge initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeInit {
    pub authorization_url: String,
    pub reference: String,
}

/// gateway-reported charge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    Success,
    Pending,
    Failed,
    Abandoned,
}

/// verified charge details as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeVerification {
    pub status: ChargeStatus,
    pub amount_minor: i64,
    pub paid_at: Option<DateTime<Utc>>,
    pub channel: Option<String>,
}

/// handle for an initiated outbound transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_code: String,
    pub status: String,
}
