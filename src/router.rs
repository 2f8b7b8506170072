use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RentConfig;
use crate::contracts::{dates, Contract, ContractStore};
use crate::decimal::Money;
use crate::errors::{RentError, Result};
use crate::escrow::EscrowAccumulator;
use crate::events::{Event, EventStore};
use crate::gateway::{ChargeStatus, PaymentGateway};
use crate::payments::{due_status, Payment, PaymentStore, SettleOutcome};
use crate::types::{ContractId, DueStatus, LandlordId, PaymentId, PayoutType, TransactionId};
use crate::wallet::WalletLedger;

/// result of routing one rent payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub payout_type: PayoutType,
    pub amount: Money,
    pub next_due: NaiveDate,
    pub reference: String,
    /// true when this call observed an already-settled reference and
    /// performed no side effects
    pub replayed: bool,
}

/// handle returned to the payer after charge initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializedPayment {
    pub payment_id: PaymentId,
    pub reference: String,
    pub authorization_url: String,
    pub amount: Money,
}

/// receipt for a completed withdrawal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub transaction_id: TransactionId,
    pub transfer_code: String,
    pub amount: Money,
}

/// an active contract's next obligation, classified against today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub contract_id: ContractId,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub status: DueStatus,
}

/// orchestrates payment verification and routes collected rent to the
/// wallet ledger or the escrow accumulator
pub struct PaymentRouter {
    contracts: Arc<ContractStore>,
    payments: Arc<PaymentStore>,
    wallet: Arc<WalletLedger>,
    escrow: Arc<EscrowAccumulator>,
    gateway: Arc<dyn PaymentGateway>,
    config: RentConfig,
    pub events: EventStore,
}

impl PaymentRouter {
    pub fn new(
        contracts: Arc<ContractStore>,
        payments: Arc<PaymentStore>,
        wallet: Arc<WalletLedger>,
        escrow: Arc<EscrowAccumulator>,
        gateway: Arc<dyn PaymentGateway>,
        config: RentConfig,
    ) -> Self {
        Self {
            contracts,
            payments,
            wallet,
            escrow,
            gateway,
            config,
            events: EventStore::new(),
        }
    }

    pub fn payments(&self) -> &PaymentStore {
        &self.payments
    }

    /// ask the gateway for a charge and record a pending payment; no
    /// ledger state changes here
    pub fn initialize_payment(
        &self,
        contract_id: ContractId,
        payer_email: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<InitializedPayment> {
        let contract = self.contracts.require(contract_id)?;
        if !contract.can_accept_payment() {
            return Err(RentError::NotActive {
                status: contract.status,
            });
        }

        let requested = format!("rent-{}", Uuid::new_v4().simple());
        let init = self.gateway.initialize_charge(
            payer_email,
            contract.monthly_amount.to_minor(),
            &requested,
            &json!({
                "contract_id": contract.id,
                "due_date": contract.next_payment_due,
            }),
        )?;
        // adapters may rewrite the reference; the stored record must carry
        // the handle the webhook will present
        let reference = init.reference;

        let now = time_provider.now();
        let payment = Payment {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            amount: contract.monthly_amount,
            amount_paid: None,
            due_date: contract.next_payment_due,
            paid_date: None,
            status: crate::types::PaymentStatus::Pending,
            reference: reference.clone(),
            gateway_status: None,
            created_at: now,
        };
        self.payments.insert(payment.clone());

        self.events.emit(Event::PaymentInitialized {
            payment_id: payment.id,
            contract_id: contract.id,
            amount: contract.monthly_amount,
            reference: reference.clone(),
            timestamp: now,
        });

        Ok(InitializedPayment {
            payment_id: payment.id,
            reference,
            authorization_url: init.authorization_url,
            amount: contract.monthly_amount,
        })
    }

    /// validate a collected amount against the contract and route it
    ///
    /// The amount check is a hard rejection: an off-by-more-than-epsilon
    /// collection must never be laundered into the ledger.
    pub fn process_payment(
        &self,
        contract_id: ContractId,
        amount: Money,
        method: &str,
        reference: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let contract = self.contracts.require(contract_id)?;
        self.validate_collectable(&contract, amount)?;
        self.settle_and_route(&contract, reference, method, None, time_provider)
    }

    /// verification trust boundary: confirm the charge with the gateway,
    /// check amount integrity, then route
    pub fn complete_payment(
        &self,
        reference: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let payment =
            self.payments
                .find_by_reference(reference)
                .ok_or(RentError::NotFound {
                    entity: "payment",
                    id: reference.to_string(),
                })?;

        if payment.status == crate::types::PaymentStatus::Paid {
            let contract = self.contracts.require(payment.contract_id)?;
            return Ok(self.replayed_outcome(&payment, &contract));
        }

        let verification = self.gateway.verify_charge(reference)?;
        if verification.status != ChargeStatus::Success {
            return Err(RentError::InvalidInput {
                message: format!(
                    "charge {} not successful: gateway reported {:?}",
                    reference, verification.status
                ),
            });
        }

        let collected = Money::from_minor(verification.amount_minor);
        let contract = self.contracts.require(payment.contract_id)?;
        self.validate_collectable(&contract, collected)?;

        let channel = verification.channel.as_deref().unwrap_or("card");
        self.settle_and_route(
            &contract,
            reference,
            channel,
            Some("success".to_string()),
            time_provider,
        )
    }

    /// next obligations across active contracts due within the window
    pub fn upcoming_payments(
        &self,
        within_days: i64,
        time_provider: &SafeTimeProvider,
    ) -> Vec<UpcomingPayment> {
        let today = time_provider.now().date_naive();
        let horizon = today + Duration::days(within_days);
        let mut upcoming: Vec<UpcomingPayment> = self
            .contracts
            .active_contracts()
            .into_iter()
            .filter(|c| c.next_payment_due <= horizon)
            .map(|c| UpcomingPayment {
                contract_id: c.id,
                due_date: c.next_payment_due,
                amount: c.monthly_amount,
                status: due_status(c.next_payment_due, today, self.config.grace_period_days),
            })
            .collect();
        upcoming.sort_by_key(|u| u.due_date);
        upcoming
    }

    /// classify a due date against now using the configured grace period
    pub fn payment_status(&self, due: NaiveDate, time_provider: &SafeTimeProvider) -> DueStatus {
        due_status(
            due,
            time_provider.now().date_naive(),
            self.config.grace_period_days,
        )
    }

    /// expire pending payments that never saw verification, freeing the
    /// tenant to retry
    pub fn expire_stale_payments(&self, time_provider: &SafeTimeProvider) -> usize {
        let now = time_provider.now();
        let ttl = Duration::minutes(self.config.pending_payment_ttl_minutes);
        let expired = self.payments.expire_stale(now, ttl);
        for payment in &expired {
            self.events.emit(Event::PaymentExpired {
                payment_id: payment.id,
                reference: payment.reference.clone(),
                timestamp: now,
            });
        }
        expired.len()
    }

    /// two-phase withdrawal: debit the wallet, then request the external
    /// transfer; a failed transfer is compensated with a refund credit
    /// (the debit is already durably recorded, so this is a saga step,
    /// not a rollback)
    pub fn request_withdrawal(
        &self,
        landlord_id: LandlordId,
        amount: Money,
        recipient: &str,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<WithdrawalReceipt> {
        let reference = format!("wd-{}", Uuid::new_v4().simple());
        let debit = self.wallet.withdraw(
            landlord_id,
            amount,
            reference.clone(),
            json!({ "type": "withdrawal", "recipient": recipient }),
            time_provider,
        )?;

        match self
            .gateway
            .initiate_transfer(amount.to_minor(), recipient, reason)
        {
            Ok(receipt) => {
                let now = time_provider.now();
                info!(
                    landlord = %landlord_id,
                    amount = %amount,
                    transfer_code = %receipt.transfer_code,
                    "withdrawal transfer initiated"
                );
                self.events.emit(Event::WithdrawalRequested {
                    landlord_id,
                    amount,
                    transfer_code: receipt.transfer_code.clone(),
                    timestamp: now,
                });
                Ok(WithdrawalReceipt {
                    transaction_id: debit.id,
                    transfer_code: receipt.transfer_code,
                    amount,
                })
            }
            Err(err) => {
                warn!(
                    landlord = %landlord_id,
                    amount = %amount,
                    error = %err,
                    "transfer failed, compensating debit"
                );
                self.wallet.refund(
                    landlord_id,
                    amount,
                    format!("refund-{}", debit.id),
                    json!({
                        "type": "withdrawal_compensation",
                        "original_transaction": debit.id,
                    }),
                    time_provider,
                )?;
                self.events.emit(Event::WithdrawalCompensated {
                    landlord_id,
                    amount,
                    reason: err.to_string(),
                    timestamp: time_provider.now(),
                });
                Err(err)
            }
        }
    }

    fn validate_collectable(&self, contract: &Contract, amount: Money) -> Result<()> {
        if !contract.can_accept_payment() {
            return Err(RentError::NotActive {
                status: contract.status,
            });
        }
        if (amount - contract.monthly_amount).abs() > self.config.amount_epsilon {
            return Err(RentError::AmountMismatch {
                expected: contract.monthly_amount,
                received: amount,
            });
        }
        Ok(())
    }

    /// the single canonical outcome per payment event: win the settlement
    /// race, route to wallet or escrow, advance the due date
    fn settle_and_route(
        &self,
        contract: &Contract,
        reference: &str,
        method: &str,
        gateway_status: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        let now = time_provider.now();
        // amount recorded is always the obligation at processing time
        let amount = contract.monthly_amount;

        let (payment, outcome) = self.payments.settle(
            reference,
            contract.id,
            amount,
            contract.next_payment_due,
            gateway_status,
            now,
        )?;
        if outcome == SettleOutcome::AlreadyPaid {
            let current = self.contracts.require(contract.id)?;
            return Ok(self.replayed_outcome(&payment, &current));
        }

        match contract.payout_type {
            PayoutType::Immediate => {
                self.wallet.credit(
                    contract.landlord_id,
                    amount,
                    reference.to_string(),
                    json!({
                        "type": "rent_payment",
                        "contract_id": contract.id,
                        "method": method,
                    }),
                    time_provider,
                )?;
            }
            PayoutType::Deferred => {
                self.escrow
                    .accumulate(contract.landlord_id, contract.id, amount, time_provider)?;
            }
        }

        let next_due = self.contracts.update(contract.id, |c| {
            c.next_payment_due = dates::advance_one_month(c.next_payment_due);
            c.updated_at = now;
            Ok(c.next_payment_due)
        })?;

        self.events.emit(Event::PaymentCompleted {
            payment_id: payment.id,
            contract_id: contract.id,
            amount,
            payout_type: contract.payout_type,
            next_due,
            reference: reference.to_string(),
            timestamp: now,
        });

        Ok(PaymentOutcome {
            payment_id: payment.id,
            contract_id: contract.id,
            payout_type: contract.payout_type,
            amount,
            next_due,
            reference: reference.to_string(),
            replayed: false,
        })
    }

    fn replayed_outcome(&self, payment: &Payment, contract: &Contract) -> PaymentOutcome {
        PaymentOutcome {
            payment_id: payment.id,
            contract_id: contract.id,
            payout_type: contract.payout_type,
            amount: payment.amount_paid.unwrap_or(payment.amount),
            next_due: contract.next_payment_due,
            reference: payment.reference.clone(),
            replayed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ContractManager, NewTenantTerms};
    use crate::directory::InMemoryDirectory;
    use crate::gateway::mock::MockGateway;
    use crate::gateway::ChargeVerification;
    use crate::types::{ContractStatus, Page, PaymentStatus, TransactionType};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    struct Fixture {
        router: PaymentRouter,
        manager: ContractManager,
        wallet: Arc<WalletLedger>,
        escrow: Arc<EscrowAccumulator>,
        gateway: Arc<MockGateway>,
        landlord: LandlordId,
        contract: Contract,
    }

    fn time_at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(payout: PayoutType) -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let tenant = Uuid::new_v4();
        let landlord = Uuid::new_v4();
        let property = Uuid::new_v4();
        let unit = Uuid::new_v4();
        directory.register_tenant(tenant);
        directory.register_landlord(landlord);
        directory.register_property(property, landlord);
        directory.register_unit(unit, property);

        let config = RentConfig::default();
        let contracts = Arc::new(ContractStore::new());
        let payments = Arc::new(PaymentStore::new());
        let wallet = Arc::new(WalletLedger::new("NGN"));
        let escrow = Arc::new(EscrowAccumulator::new(
            Arc::clone(&wallet),
            config.escrow_release_months,
        ));
        let gateway = Arc::new(MockGateway::new(b"test-secret"));

        let manager = ContractManager::new(
            Arc::clone(&contracts),
            Arc::clone(&directory) as Arc<dyn crate::directory::PartyDirectory>,
            config.clone(),
        );
        let time = time_at(2025, 2, 1);
        let contract = manager
            .create_for_new_tenant(
                NewTenantTerms {
                    tenant_id: tenant,
                    landlord_id: landlord,
                    property_id: property,
                    unit_id: unit,
                    monthly_amount: Money::from_major(2_500),
                    lease_start: date(2025, 3, 1),
                    lease_end: date(2026, 3, 1),
                    payout_type: payout,
                },
                &time,
            )
            .unwrap();

        let router = PaymentRouter::new(
            contracts,
            payments,
            Arc::clone(&wallet),
            Arc::clone(&escrow),
            Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
            config,
        );

        Fixture {
            router,
            manager,
            wallet,
            escrow,
            gateway,
            landlord,
            contract,
        }
    }

    #[test]
    fn test_immediate_payment_credits_wallet_and_advances_due() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let outcome = f
            .router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-001",
                &time,
            )
            .unwrap();

        assert!(!outcome.replayed);
        assert_eq!(outcome.payout_type, PayoutType::Immediate);
        assert_eq!(outcome.next_due, date(2025, 4, 1));
        assert_eq!(
            f.wallet.get_balance(f.landlord).unwrap().available,
            Money::from_major(2_500)
        );
        assert!(f.escrow.balance_for_contract(f.contract.id).is_none());
    }

    #[test]
    fn test_deferred_payment_accumulates_escrow_only() {
        let f = fixture(PayoutType::Deferred);
        let time = time_at(2025, 3, 1);

        f.router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-001",
                &time,
            )
            .unwrap();

        let balance = f.escrow.balance_for_contract(f.contract.id).unwrap();
        assert_eq!(balance.months_accumulated, 1);
        assert_eq!(balance.total_escrowed, Money::from_major(2_500));
        assert!(f.wallet.get_balance(f.landlord).is_none());
    }

    #[test]
    fn test_amount_mismatch_is_hard_rejection_without_mutation() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let err = f
            .router
            .process_payment(
                f.contract.id,
                Money::from_major(2_400),
                "card",
                "rent-001",
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, RentError::AmountMismatch { .. }));
        assert!(!err.is_retryable());

        // no ledger or contract mutation
        assert!(f.wallet.get_balance(f.landlord).is_none());
        assert!(f.router.payments.find_by_reference("rent-001").is_none());
        let stored = f.router.contracts.require(f.contract.id).unwrap();
        assert_eq!(stored.next_payment_due, date(2025, 3, 1));
    }

    #[test]
    fn test_payment_cannot_claim_another_contracts_reference() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        // a pending charge initialized for a different contract
        let other_contract = Uuid::new_v4();
        f.router.payments.insert(Payment {
            id: Uuid::new_v4(),
            contract_id: other_contract,
            amount: Money::from_major(9_000),
            amount_paid: None,
            due_date: date(2025, 3, 1),
            paid_date: None,
            status: PaymentStatus::Pending,
            reference: "rent-other".to_string(),
            gateway_status: None,
            created_at: time.now(),
        });

        let err = f
            .router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-other",
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, RentError::InvalidInput { .. }));

        // the foreign record is untouched and nothing was routed
        let stored = f.router.payments.find_by_reference("rent-other").unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.contract_id, other_contract);
        assert_eq!(stored.amount_paid, None);
        assert!(f.wallet.get_balance(f.landlord).is_none());
        let contract = f.router.contracts.require(f.contract.id).unwrap();
        assert_eq!(contract.next_payment_due, date(2025, 3, 1));
    }

    #[test]
    fn test_amount_within_epsilon_accepted() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let outcome = f
            .router
            .process_payment(
                f.contract.id,
                Money::from_str_exact("2500.01").unwrap(),
                "card",
                "rent-001",
                &time,
            )
            .unwrap();

        // the ledger records the obligation amount, not the collected figure
        assert_eq!(outcome.amount, Money::from_major(2_500));
        assert_eq!(
            f.wallet.get_balance(f.landlord).unwrap().available,
            Money::from_major(2_500)
        );
    }

    #[test]
    fn test_terminated_contract_rejects_payment() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);
        f.manager.terminate_contract(f.contract.id, &time).unwrap();

        let err = f
            .router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-001",
                &time,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RentError::NotActive {
                status: ContractStatus::Terminated
            }
        ));
    }

    #[test]
    fn test_complete_payment_is_idempotent() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let init = f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &time)
            .unwrap();
        f.gateway.expect_verification(
            &init.reference,
            ChargeVerification {
                status: ChargeStatus::Success,
                amount_minor: 250_000,
                paid_at: Some(time.now()),
                channel: Some("card".to_string()),
            },
        );

        let first = f.router.complete_payment(&init.reference, &time).unwrap();
        assert!(!first.replayed);
        assert_eq!(first.next_due, date(2025, 4, 1));

        let second = f.router.complete_payment(&init.reference, &time).unwrap();
        assert!(second.replayed);
        assert_eq!(second.next_due, date(2025, 4, 1));

        // exactly one paid record and one wallet credit
        let payment = f.router.payments.find_by_reference(&init.reference).unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(f.wallet.get_transactions(f.landlord, Page::default()).len(), 1);
        assert_eq!(
            f.wallet.get_balance(f.landlord).unwrap().available,
            Money::from_major(2_500)
        );
    }

    #[test]
    fn test_gateway_rewritten_reference_is_the_stored_handle() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);
        f.gateway.set_rewrite_references(true);

        let init = f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &time)
            .unwrap();
        assert!(init.reference.starts_with("psp-"));

        // the record is keyed by the handle the webhook will present
        let stored = f.router.payments.find_by_reference(&init.reference).unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);

        f.gateway.expect_verification(
            &init.reference,
            ChargeVerification {
                status: ChargeStatus::Success,
                amount_minor: 250_000,
                paid_at: Some(time.now()),
                channel: Some("card".to_string()),
            },
        );
        let outcome = f.router.complete_payment(&init.reference, &time).unwrap();
        assert!(!outcome.replayed);
        assert_eq!(
            f.wallet.get_balance(f.landlord).unwrap().available,
            Money::from_major(2_500)
        );
    }

    #[test]
    fn test_complete_payment_gateway_amount_mismatch() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let init = f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &time)
            .unwrap();
        f.gateway.expect_verification(
            &init.reference,
            ChargeVerification {
                status: ChargeStatus::Success,
                amount_minor: 100_000, // gateway saw 1000.00, expected 2500.00
                paid_at: Some(time.now()),
                channel: None,
            },
        );

        let err = f.router.complete_payment(&init.reference, &time).unwrap_err();
        assert!(matches!(err, RentError::AmountMismatch { .. }));
        assert!(f.wallet.get_balance(f.landlord).is_none());
        assert_eq!(
            f.router
                .payments
                .find_by_reference(&init.reference)
                .unwrap()
                .status,
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_complete_payment_unsuccessful_charge() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);

        let init = f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &time)
            .unwrap();
        f.gateway.expect_verification(
            &init.reference,
            ChargeVerification {
                status: ChargeStatus::Failed,
                amount_minor: 0,
                paid_at: None,
                channel: None,
            },
        );

        let err = f.router.complete_payment(&init.reference, &time).unwrap_err();
        assert!(matches!(err, RentError::InvalidInput { .. }));
    }

    #[test]
    fn test_twelve_deferred_payments_reach_release() {
        let f = fixture(PayoutType::Deferred);
        let monthly = Money::from_major(2_500);

        for month in 0..12u32 {
            let time = time_at(2025, 3 + (month % 10), 1);
            f.router
                .process_payment(
                    f.contract.id,
                    monthly,
                    "transfer",
                    &format!("rent-{:03}", month),
                    &time,
                )
                .unwrap();
        }

        let balance = f.escrow.balance_for_contract(f.contract.id).unwrap();
        assert_eq!(balance.months_accumulated, 12);
        assert_eq!(balance.total_escrowed, monthly.times(12));
        assert!(f.wallet.get_balance(f.landlord).is_none());

        // due date advanced one calendar month per payment
        let contract = f.router.contracts.require(f.contract.id).unwrap();
        assert_eq!(contract.next_payment_due, date(2026, 3, 1));

        // release moves the lump sum into the wallet
        let time = time_at(2026, 3, 1);
        f.escrow.release(balance.id, &time).unwrap();
        assert_eq!(
            f.wallet.get_balance(f.landlord).unwrap().available,
            monthly.times(12)
        );
    }

    #[test]
    fn test_stale_pending_payment_expires() {
        let f = fixture(PayoutType::Immediate);
        let start = time_at(2025, 3, 1);

        let init = f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &start)
            .unwrap();

        // ten minutes later, no verification arrived
        let later = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 10, 0).unwrap(),
        ));
        assert_eq!(f.router.expire_stale_payments(&later), 1);
        assert_eq!(
            f.router
                .payments
                .find_by_reference(&init.reference)
                .unwrap()
                .status,
            PaymentStatus::Overdue
        );

        // the tenant can initialize a fresh attempt
        assert!(f
            .router
            .initialize_payment(f.contract.id, "tenant@example.com", &later)
            .is_ok());
    }

    #[test]
    fn test_withdrawal_saga_compensates_failed_transfer() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);
        f.router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-001",
                &time,
            )
            .unwrap();

        f.gateway.set_fail_transfers(true);
        let err = f
            .router
            .request_withdrawal(f.landlord, Money::from_major(1_000), "bank-1", "payout", &time)
            .unwrap_err();
        assert!(matches!(err, RentError::GatewayUnavailable { .. }));
        assert!(err.is_retryable());

        // balance restored via a refund entry, debit still on the ledger
        let balance = f.wallet.get_balance(f.landlord).unwrap();
        assert_eq!(balance.available, Money::from_major(2_500));
        assert_eq!(balance.available, f.wallet.ledger_sum(f.landlord));
        let history = f.wallet.get_transactions(f.landlord, Page::default());
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].tx_type, TransactionType::Refund);
        assert_eq!(history[1].tx_type, TransactionType::Withdrawal);
    }

    #[test]
    fn test_withdrawal_success_debits_wallet() {
        let f = fixture(PayoutType::Immediate);
        let time = time_at(2025, 3, 1);
        f.router
            .process_payment(
                f.contract.id,
                Money::from_major(2_500),
                "card",
                "rent-001",
                &time,
            )
            .unwrap();

        let receipt = f
            .router
            .request_withdrawal(f.landlord, Money::from_major(1_000), "bank-1", "payout", &time)
            .unwrap();
        assert_eq!(receipt.amount, Money::from_major(1_000));
        assert_eq!(f.gateway.transfers_initiated(), 1);

        let balance = f.wallet.get_balance(f.landlord).unwrap();
        assert_eq!(balance.available, Money::from_major(1_500));
        assert_eq!(balance.total_withdrawn, Money::from_major(1_000));
    }

    #[test]
    fn test_upcoming_payments_classification() {
        let f = fixture(PayoutType::Immediate);

        // before the due date
        let early = time_at(2025, 2, 20);
        let upcoming = f.router.upcoming_payments(30, &early);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].status, DueStatus::Upcoming);

        // inside the grace window
        let due = time_at(2025, 3, 4);
        assert_eq!(f.router.upcoming_payments(30, &due)[0].status, DueStatus::Due);

        // past the grace window
        let late = time_at(2025, 3, 15);
        assert_eq!(
            f.router.upcoming_payments(30, &late)[0].status,
            DueStatus::Overdue
        );
    }
}
