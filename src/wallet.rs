use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{RentError, Result};
use crate::events::{Event, EventStore};
use crate::types::{LandlordId, Page, TransactionId, TransactionStatus, TransactionType};

/// per-landlord balance aggregate, created lazily on first credit or debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub landlord_id: LandlordId,
    pub available: Money,
    pub pending: Money,
    pub total_earned: Money,
    pub total_withdrawn: Money,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

/// append-only ledger entry; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub landlord_id: LandlordId,
    pub tx_type: TransactionType,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub reference: String,
    pub status: TransactionStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WalletAccount {
    balance: WalletBalance,
    transactions: Vec<WalletTransaction>,
}

/// per-landlord balance store with append-only transaction history
///
/// Each landlord's account sits behind its own mutex: concurrent mutations
/// on one landlord serialize on that lock, while distinct landlords proceed
/// in parallel. The transaction append and the aggregate update happen
/// under the same lock, so no partial write is observable.
pub struct WalletLedger {
    accounts: RwLock<HashMap<LandlordId, Arc<Mutex<WalletAccount>>>>,
    currency: String,
    pub events: EventStore,
}

impl WalletLedger {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            currency: currency.into(),
            events: EventStore::new(),
        }
    }

    /// credit rent income to the landlord wallet
    pub fn credit(
        &self,
        landlord_id: LandlordId,
        amount: Money,
        reference: impl Into<String>,
        metadata: serde_json::Value,
        time_provider: &SafeTimeProvider,
    ) -> Result<WalletTransaction> {
        self.apply(
            landlord_id,
            TransactionType::Credit,
            amount,
            reference.into(),
            metadata,
            time_provider,
        )
    }

    /// compensating credit after a failed external transfer
    pub fn refund(
        &self,
        landlord_id: LandlordId,
        amount: Money,
        reference: impl Into<String>,
        metadata: serde_json::Value,
        time_provider: &SafeTimeProvider,
    ) -> Result<WalletTransaction> {
        self.apply(
            landlord_id,
            TransactionType::Refund,
            amount,
            reference.into(),
            metadata,
            time_provider,
        )
    }

    /// debit against the available balance
    pub fn debit(
        &self,
        landlord_id: LandlordId,
        amount: Money,
        reference: impl Into<String>,
        metadata: serde_json::Value,
        time_provider: &SafeTimeProvider,
    ) -> Result<WalletTransaction> {
        self.apply(
            landlord_id,
            TransactionType::Debit,
            amount,
            reference.into(),
            metadata,
            time_provider,
        )
    }

    /// debit that also counts toward lifetime withdrawals
    pub fn withdraw(
        &self,
        landlord_id: LandlordId,
        amount: Money,
        reference: impl Into<String>,
        metadata: serde_json::Value,
        time_provider: &SafeTimeProvider,
    ) -> Result<WalletTransaction> {
        self.apply(
            landlord_id,
            TransactionType::Withdrawal,
            amount,
            reference.into(),
            metadata,
            time_provider,
        )
    }

    fn apply(
        &self,
        landlord_id: LandlordId,
        tx_type: TransactionType,
        amount: Money,
        reference: String,
        metadata: serde_json::Value,
        time_provider: &SafeTimeProvider,
    ) -> Result<WalletTransaction> {
        if !amount.is_positive() {
            return Err(RentError::InvalidInput {
                message: format!("transaction amount {} must be positive", amount),
            });
        }

        let now = time_provider.now();
        let account = self.account_for(landlord_id, now)?;
        let mut account = account.lock().map_err(|_| RentError::InvalidInput {
            message: "wallet account lock poisoned".to_string(),
        })?;

        let balance_before = account.balance.available;
        let balance_after = if tx_type.is_inflow() {
            balance_before + amount
        } else {
            if amount > balance_before {
                return Err(RentError::InsufficientBalance {
                    available: balance_before,
                    requested: amount,
                });
            }
            balance_before - amount
        };

        let transaction = WalletTransaction {
            id: Uuid::new_v4(),
            landlord_id,
            tx_type,
            amount,
            balance_before,
            balance_after,
            reference: reference.clone(),
            status: TransactionStatus::Completed,
            metadata,
            created_at: now,
        };

        account.balance.available = balance_after;
        account.balance.updated_at = now;
        match tx_type {
            TransactionType::Credit => account.balance.total_earned += amount,
            TransactionType::Withdrawal => account.balance.total_withdrawn += amount,
            TransactionType::Debit | TransactionType::Refund => {}
        }
        account.transactions.push(transaction.clone());
        drop(account);

        let event = if tx_type.is_inflow() {
            Event::WalletCredited {
                transaction_id: transaction.id,
                landlord_id,
                tx_type,
                amount,
                balance_after,
                reference,
                timestamp: now,
            }
        } else {
            Event::WalletDebited {
                transaction_id: transaction.id,
                landlord_id,
                tx_type,
                amount,
                balance_after,
                reference,
                timestamp: now,
            }
        };
        self.events.emit(event);

        Ok(transaction)
    }

    /// current balance aggregate, if the wallet exists
    pub fn get_balance(&self, landlord_id: LandlordId) -> Option<WalletBalance> {
        let accounts = self.accounts.read().ok()?;
        let account = accounts.get(&landlord_id)?;
        account.lock().ok().map(|acct| acct.balance.clone())
    }

    /// transaction history, most recent first
    pub fn get_transactions(&self, landlord_id: LandlordId, page: Page) -> Vec<WalletTransaction> {
        let accounts = match self.accounts.read() {
            Ok(accounts) => accounts,
            Err(_) => return Vec::new(),
        };
        let Some(account) = accounts.get(&landlord_id) else {
            return Vec::new();
        };
        let Ok(account) = account.lock() else {
            return Vec::new();
        };
        account
            .transactions
            .iter()
            .rev()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }

    /// reconciliation projection: Σ(inflows) − Σ(outflows) over the history;
    /// must always equal the available balance
    pub fn ledger_sum(&self, landlord_id: LandlordId) -> Money {
        let accounts = match self.accounts.read() {
            Ok(accounts) => accounts,
            Err(_) => return Money::ZERO,
        };
        let Some(account) = accounts.get(&landlord_id) else {
            return Money::ZERO;
        };
        let Ok(account) = account.lock() else {
            return Money::ZERO;
        };
        account
            .transactions
            .iter()
            .fold(Money::ZERO, |sum, tx| match tx.tx_type.is_inflow() {
                true => sum + tx.amount,
                false => sum - tx.amount,
            })
    }

    fn account_for(
        &self,
        landlord_id: LandlordId,
        now: DateTime<Utc>,
    ) -> Result<Arc<Mutex<WalletAccount>>> {
        {
            let accounts = self.accounts.read().map_err(|_| RentError::InvalidInput {
                message: "wallet registry lock poisoned".to_string(),
            })?;
            if let Some(account) = accounts.get(&landlord_id) {
                return Ok(Arc::clone(account));
            }
        }

        let mut accounts = self.accounts.write().map_err(|_| RentError::InvalidInput {
            message: "wallet registry lock poisoned".to_string(),
        })?;
        let account = accounts.entry(landlord_id).or_insert_with(|| {
            Arc::new(Mutex::new(WalletAccount {
                balance: WalletBalance {
                    landlord_id,
                    available: Money::ZERO,
                    pending: Money::ZERO,
                    total_earned: Money::ZERO,
                    total_withdrawn: Money::ZERO,
                    currency: self.currency.clone(),
                    updated_at: now,
                },
                transactions: Vec::new(),
            }))
        });
        Ok(Arc::clone(account))
    }
}
