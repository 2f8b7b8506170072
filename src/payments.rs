use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{RentError, Result};
use crate::types::{ContractId, DueStatus, PaymentId, PaymentStatus};

/// one attempted or completed collection event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub contract_id: ContractId,
    /// obligation amount at initialization time
    pub amount: Money,
    /// amount actually recorded on settlement; always the contract's
    /// monthly amount at processing time, never the gateway figure verbatim
    pub amount_paid: Option<Money>,
    pub due_date: NaiveDate,
    pub paid_date: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
    /// unique external gateway reference
    pub reference: String,
    /// last status string reported by the gateway
    pub gateway_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// outcome of the write-once settlement race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// this caller performed the Pending -> Paid transition
    Settled,
    /// another caller already settled this reference; no side effects
    AlreadyPaid,
}

/// in-memory payment repository keyed by external reference
///
/// The settlement transition is a compare-and-set under the store lock:
/// exactly one caller wins a concurrent race on the same reference.
#[derive(Debug, Default)]
pub struct PaymentStore {
    payments: Mutex<HashMap<String, Payment>>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, payment: Payment) {
        if let Ok(mut payments) = self.payments.lock() {
            payments.insert(payment.reference.clone(), payment);
        }
    }

    pub fn find_by_reference(&self, reference: &str) -> Option<Payment> {
        self.payments
            .lock()
            .ok()
            .and_then(|payments| payments.get(reference).cloned())
    }

    pub fn find_by_contract(&self, contract_id: ContractId) -> Vec<Payment> {
        self.payments
            .lock()
            .map(|payments| {
                let mut found: Vec<Payment> = payments
                    .values()
                    .filter(|p| p.contract_id == contract_id)
                    .cloned()
                    .collect();
                found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                found
            })
            .unwrap_or_default()
    }

    /// write-once settlement keyed on (reference, prior status = Pending)
    ///
    /// Absent references are inserted directly as Paid, covering the direct
    /// `process_payment` path where no charge was initialized first.
    pub fn settle(
        &self,
        reference: &str,
        contract_id: ContractId,
        amount_paid: Money,
        due_date: NaiveDate,
        gateway_status: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Payment, SettleOutcome)> {
        let mut payments = self.payments.lock().map_err(|_| RentError::InvalidInput {
            message: "payment store lock poisoned".to_string(),
        })?;

        match payments.get_mut(reference) {
            Some(payment) => {
                // a reference is bound to its contract at initialization;
                // settlement against any other contract must not touch it
                if payment.contract_id != contract_id {
                    return Err(RentError::InvalidInput {
                        message: format!(
                            "reference {} belongs to another contract",
                            reference
                        ),
                    });
                }
                match payment.status {
                    PaymentStatus::Paid => Ok((payment.clone(), SettleOutcome::AlreadyPaid)),
                    PaymentStatus::Pending | PaymentStatus::Overdue => {
                        payment.status = PaymentStatus::Paid;
                        payment.amount_paid = Some(amount_paid);
                        payment.paid_date = Some(now);
                        if gateway_status.is_some() {
                            payment.gateway_status = gateway_status;
                        }
                        Ok((payment.clone(), SettleOutcome::Settled))
                    }
                    PaymentStatus::Partial => Err(RentError::InvalidInput {
                        message: format!("payment {} is partially collected", reference),
                    }),
                }
            }
            None => {
                let payment = Payment {
                    id: Uuid::new_v4(),
                    contract_id,
                    amount: amount_paid,
                    amount_paid: Some(amount_paid),
                    due_date,
                    paid_date: Some(now),
                    status: PaymentStatus::Paid,
                    reference: reference.to_string(),
                    gateway_status,
                    created_at: now,
                };
                payments.insert(reference.to_string(), payment.clone());
                Ok((payment, SettleOutcome::Settled))
            }
        }
    }

    /// expire pending payments older than `ttl` so the tenant can retry
    pub fn expire_stale(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<Payment> {
        let mut expired = Vec::new();
        if let Ok(mut payments) = self.payments.lock() {
            for payment in payments.values_mut() {
                if payment.status == PaymentStatus::Pending && now - payment.created_at > ttl {
                    payment.status = PaymentStatus::Overdue;
                    expired.push(payment.clone());
                }
            }
        }
        expired
    }
}

/// classify a due date relative to today, with a grace period before a due
/// payment turns overdue
pub fn due_status(due: NaiveDate, today: NaiveDate, grace_period_days: u32) -> DueStatus {
    if today < due {
        DueStatus::Upcoming
    } else if today <= due + Duration::days(grace_period_days as i64) {
        DueStatus::Due
    } else {
        DueStatus::Overdue
    }
}
