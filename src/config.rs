use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;

/// tunable policy for the rent subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentConfig {
    /// ledger currency code
    pub currency: String,
    /// tolerance when comparing a collected amount to the obligation
    pub amount_epsilon: Money,
    /// days past due before a due payment classifies as overdue
    pub grace_period_days: u32,
    /// minutes a pending payment may wait for verification before auto-expiry
    pub pending_payment_ttl_minutes: i64,
    /// months of accumulation before a deferred escrow is expected to release
    pub escrow_release_months: u32,
    /// lead time before lease expiry for immediate-payout transitions
    pub immediate_lead_months: u32,
    /// lead time before lease expiry for deferred-payout transitions
    pub deferred_lead_months: u32,
    /// default extension when an existing tenant supplies no new lease end
    pub default_lease_extension_months: u32,
}

impl Default for RentConfig {
    fn default() -> Self {
        Self {
            currency: "NGN".to_string(),
            amount_epsilon: Money::from_decimal(dec!(0.01)),
            grace_period_days: 5,
            pending_payment_ttl_minutes: 5,
            escrow_release_months: 12,
            immediate_lead_months: 3,
            deferred_lead_months: 6,
            default_lease_extension_months: 12,
        }
    }
}

impl RentConfig {
    /// lead months for an incoming tenant, by payout election
    pub fn lead_months(&self, payout_type: crate::types::PayoutType) -> u32 {
        match payout_type {
            crate::types::PayoutType::Immediate => self.immediate_lead_months,
            crate::types::PayoutType::Deferred => self.deferred_lead_months,
        }
    }
}
