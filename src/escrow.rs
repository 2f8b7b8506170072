use chrono::{DateTime, Months, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{RentError, Result};
use crate::events::{Event, EventStore};
use crate::types::{ContractId, EscrowId, LandlordId};
use crate::wallet::WalletLedger;

/// running balance for a deferred-payout contract, held until release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowBalance {
    pub id: EscrowId,
    pub landlord_id: LandlordId,
    pub contract_id: ContractId,
    pub total_escrowed: Money,
    pub months_accumulated: u32,
    pub expected_release: NaiveDate,
    pub released: bool,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// accumulates deferred rent per contract and releases it to the wallet
/// ledger as a single lump sum
pub struct EscrowAccumulator {
    entries: Mutex<HashMap<EscrowId, EscrowBalance>>,
    wallet: Arc<WalletLedger>,
    release_after_months: u32,
    pub events: EventStore,
}

impl EscrowAccumulator {
    pub fn new(wallet: Arc<WalletLedger>, release_after_months: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            wallet,
            release_after_months,
            events: EventStore::new(),
        }
    }

    /// add one month of rent to the contract's unreleased escrow balance;
    /// creates the balance on first accumulation. Never touches the wallet.
    pub fn accumulate(
        &self,
        landlord_id: LandlordId,
        contract_id: ContractId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<EscrowBalance> {
        if !amount.is_positive() {
            return Err(RentError::InvalidInput {
                message: format!("escrow amount {} must be positive", amount),
            });
        }

        let now = time_provider.now();
        let mut entries = self.entries.lock().map_err(|_| RentError::InvalidInput {
            message: "escrow store lock poisoned".to_string(),
        })?;

        let entry = entries
            .values_mut()
            .find(|e| e.contract_id == contract_id && !e.released);

        let updated = match entry {
            Some(entry) => {
                entry.total_escrowed += amount;
                entry.months_accumulated += 1;
                entry.clone()
            }
            None => {
                let entry = EscrowBalance {
                    id: Uuid::new_v4(),
                    landlord_id,
                    contract_id,
                    total_escrowed: amount,
                    months_accumulated: 1,
                    expected_release: now.date_naive() + Months::new(self.release_after_months),
                    released: false,
                    created_at: now,
                    released_at: None,
                };
                entries.insert(entry.id, entry.clone());
                entry
            }
        };
        drop(entries);

        self.events.emit(Event::EscrowAccumulated {
            escrow_id: updated.id,
            contract_id,
            amount,
            total_escrowed: updated.total_escrowed,
            months_accumulated: updated.months_accumulated,
            timestamp: now,
        });

        Ok(updated)
    }

    /// release the full accumulated amount to the landlord wallet in one
    /// atomic step; partial release is not supported
    pub fn release(
        &self,
        escrow_id: EscrowId,
        time_provider: &SafeTimeProvider,
    ) -> Result<EscrowBalance> {
        let now = time_provider.now();
        let released = self.reserve_release(escrow_id, now)?;

        if let Err(err) = self.wallet.credit(
            released.landlord_id,
            released.total_escrowed,
            format!("escrow-release-{}", released.id),
            json!({
                "type": "escrow_release",
                "contract_id": released.contract_id,
                "months_accumulated": released.months_accumulated,
            }),
            time_provider,
        ) {
            // the funds never reached the wallet; put the balance back so
            // release can be retried
            self.cancel_release(escrow_id);
            return Err(err);
        }

        self.events.emit(Event::EscrowReleased {
            escrow_id: released.id,
            contract_id: released.contract_id,
            landlord_id: released.landlord_id,
            amount: released.total_escrowed,
            timestamp: now,
        });

        Ok(released)
    }

    /// mark the balance released under the lock so a concurrent release
    /// observes `EscrowAlreadyReleased`; the wallet credit follows
    fn reserve_release(&self, escrow_id: EscrowId, now: DateTime<Utc>) -> Result<EscrowBalance> {
        let mut entries = self.entries.lock().map_err(|_| RentError::InvalidInput {
            message: "escrow store lock poisoned".to_string(),
        })?;
        let entry = entries.get_mut(&escrow_id).ok_or(RentError::NotFound {
            entity: "escrow balance",
            id: escrow_id.to_string(),
        })?;
        if entry.released {
            return Err(RentError::EscrowAlreadyReleased { id: escrow_id });
        }
        entry.released = true;
        entry.released_at = Some(now);
        Ok(entry.clone())
    }

    fn cancel_release(&self, escrow_id: EscrowId) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get_mut(&escrow_id) {
                entry.released = false;
                entry.released_at = None;
            }
        }
    }

    /// the unreleased balance for a contract, if any
    pub fn balance_for_contract(&self, contract_id: ContractId) -> Option<EscrowBalance> {
        self.entries.lock().ok().and_then(|entries| {
            entries
                .values()
                .find(|e| e.contract_id == contract_id && !e.released)
                .cloned()
        })
    }

    /// all unreleased balances held for a landlord
    pub fn unreleased_for_landlord(&self, landlord_id: LandlordId) -> Vec<EscrowBalance> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .values()
                    .filter(|e| e.landlord_id == landlord_id && !e.released)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
