use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::decimal::Money;
use crate::types::{
    ContractId, EscrowId, LandlordId, PaymentId, PayoutType, TransactionId, TransactionType,
};

/// all events emitted by the rent subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // contract lifecycle
    ContractCreated {
        contract_id: ContractId,
        landlord_id: LandlordId,
        monthly_amount: Money,
        payout_type: PayoutType,
        first_due: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    ContractUpdated {
        contract_id: ContractId,
        timestamp: DateTime<Utc>,
    },
    ContractTerminated {
        contract_id: ContractId,
        timestamp: DateTime<Utc>,
    },
    ContractExpired {
        contract_id: ContractId,
        lease_end: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    // payment flow
    PaymentInitialized {
        payment_id: PaymentId,
        contract_id: ContractId,
        amount: Money,
        reference: String,
        timestamp: DateTime<Utc>,
    },
    PaymentCompleted {
        payment_id: PaymentId,
        contract_id: ContractId,
        amount: Money,
        payout_type: PayoutType,
        next_due: NaiveDate,
        reference: String,
        timestamp: DateTime<Utc>,
    },
    PaymentExpired {
        payment_id: PaymentId,
        reference: String,
        timestamp: DateTime<Utc>,
    },

    // wallet ledger
    WalletCredited {
        transaction_id: TransactionId,
        landlord_id: LandlordId,
        tx_type: TransactionType,
        amount: Money,
        balance_after: Money,
        reference: String,
        timestamp: DateTime<Utc>,
    },
    WalletDebited {
        transaction_id: TransactionId,
        landlord_id: LandlordId,
        tx_type: TransactionType,
        amount: Money,
        balance_after: Money,
        reference: String,
        timestamp: DateTime<Utc>,
    },

    // escrow
    EscrowAccumulated {
        escrow_id: EscrowId,
        contract_id: ContractId,
        amount: Money,
        total_escrowed: Money,
        months_accumulated: u32,
        timestamp: DateTime<Utc>,
    },
    EscrowReleased {
        escrow_id: EscrowId,
        contract_id: ContractId,
        landlord_id: LandlordId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // withdrawal saga
    WithdrawalRequested {
        landlord_id: LandlordId,
        amount: Money,
        transfer_code: String,
        timestamp: DateTime<Utc>,
    },
    WithdrawalCompensated {
        landlord_id: LandlordId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // webhook gate
    WebhookRejected {
        reason: String,
        timestamp: DateTime<Utc>,
    },
    WebhookProcessingFailed {
        reference: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
///
/// Interior-mutable so concurrent units of work can emit without holding
/// exclusive access to the owning service.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Mutex<Vec<Event>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// drain all collected events
    pub fn take_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    /// snapshot of collected events
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}
