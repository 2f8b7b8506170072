pub mod dates;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::RentConfig;
use crate::decimal::Money;
use crate::directory::PartyDirectory;
use crate::errors::{RentError, Result};
use crate::events::{Event, EventStore};
use crate::types::{
    ContractId, ContractStatus, LandlordId, PayoutType, PropertyId, TenantId, UnitId,
};

/// a tenant's rent obligation to a landlord for a specific unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub tenant_id: TenantId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub monthly_amount: Money,
    pub lease_start: NaiveDate,
    pub lease_end: NaiveDate,
    pub payout_type: PayoutType,
    pub next_payment_due: NaiveDate,
    pub status: ContractStatus,
    pub existing_tenant: bool,
    /// stamped only for transitioning tenants, kept for arrears audit
    pub original_expiry: Option<NaiveDate>,
    pub transition_start: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn can_accept_payment(&self) -> bool {
        self.is_active()
    }
}

/// partial update for an existing contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub monthly_amount: Option<Money>,
    pub lease_end: Option<NaiveDate>,
    pub payout_type: Option<PayoutType>,
}

/// terms for a tenant newly entering the system
#[derive(Debug, Clone)]
pub struct NewTenantTerms {
    pub tenant_id: TenantId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub monthly_amount: Money,
    pub lease_start: NaiveDate,
    pub lease_end: NaiveDate,
    pub payout_type: PayoutType,
}

/// terms for a tenant transitioning in from an existing lease elsewhere
#[derive(Debug, Clone)]
pub struct ExistingTenantTerms {
    pub tenant_id: TenantId,
    pub landlord_id: LandlordId,
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub monthly_amount: Money,
    pub current_lease_expiry: NaiveDate,
    pub payout_type: PayoutType,
    /// defaults to `current_lease_expiry + 12 months` when absent
    pub new_lease_end: Option<NaiveDate>,
}

/// in-memory contract repository
///
/// All reads and read-modify-write cycles go through the store lock so two
/// concurrent mutations of the same contract cannot interleave.
#[derive(Debug, Default)]
pub struct ContractStore {
    contracts: Mutex<HashMap<ContractId, Contract>>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, contract: Contract) {
        if let Ok(mut contracts) = self.contracts.lock() {
            contracts.insert(contract.id, contract);
        }
    }

    pub fn get(&self, id: ContractId) -> Option<Contract> {
        self.contracts
            .lock()
            .ok()
            .and_then(|contracts| contracts.get(&id).cloned())
    }

    /// load a contract or fail with NotFound
    pub fn require(&self, id: ContractId) -> Result<Contract> {
        self.get(id).ok_or(RentError::NotFound {
            entity: "contract",
            id: id.to_string(),
        })
    }

    /// mutate a contract under the store lock
    pub fn update<T>(
        &self,
        id: ContractId,
        f: impl FnOnce(&mut Contract) -> Result<T>,
    ) -> Result<T> {
        let mut contracts = self.contracts.lock().map_err(|_| RentError::InvalidInput {
            message: "contract store lock poisoned".to_string(),
        })?;
        let contract = contracts.get_mut(&id).ok_or(RentError::NotFound {
            entity: "contract",
            id: id.to_string(),
        })?;
        f(contract)
    }

    /// the active contract for a (tenant, property, unit) triple, if any
    pub fn find_active(
        &self,
        tenant: TenantId,
        property: PropertyId,
        unit: UnitId,
    ) -> Option<Contract> {
        self.contracts.lock().ok().and_then(|contracts| {
            contracts
                .values()
                .find(|c| {
                    c.status == ContractStatus::Active
                        && c.tenant_id == tenant
                        && c.property_id == property
                        && c.unit_id == unit
                })
                .cloned()
        })
    }

    pub fn active_contracts(&self) -> Vec<Contract> {
        self.contracts
            .lock()
            .map(|contracts| {
                contracts
                    .values()
                    .filter(|c| c.status == ContractStatus::Active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// owns contract creation, validation, and lifecycle transitions
pub struct ContractManager {
    contracts: Arc<ContractStore>,
    directory: Arc<dyn PartyDirectory>,
    config: RentConfig,
    pub events: EventStore,
}

impl ContractManager {
    pub fn new(
        contracts: Arc<ContractStore>,
        directory: Arc<dyn PartyDirectory>,
        config: RentConfig,
    ) -> Self {
        Self {
            contracts,
            directory,
            config,
            events: EventStore::new(),
        }
    }

    /// create a contract for a tenant newly entering the system
    ///
    /// First payment due: the lease start when it falls on the 1st,
    /// otherwise the 1st of the following month.
    pub fn create_for_new_tenant(
        &self,
        terms: NewTenantTerms,
        time_provider: &SafeTimeProvider,
    ) -> Result<Contract> {
        if terms.lease_end <= terms.lease_start {
            return Err(RentError::InvalidRange {
                message: format!(
                    "lease end {} must be after lease start {}",
                    terms.lease_end, terms.lease_start
                ),
            });
        }

        self.validate_parties(
            terms.tenant_id,
            terms.landlord_id,
            terms.property_id,
            terms.unit_id,
        )?;
        self.validate_amount(terms.monthly_amount)?;
        self.reject_duplicate(terms.tenant_id, terms.property_id, terms.unit_id)?;

        let first_due = dates::first_due_on_or_after(terms.lease_start);
        let contract = self.build_contract(
            &terms.tenant_id,
            &terms.landlord_id,
            &terms.property_id,
            &terms.unit_id,
            terms.monthly_amount,
            terms.lease_start,
            terms.lease_end,
            terms.payout_type,
            first_due,
            terms.lease_start,
            false,
            None,
            time_provider,
        );

        self.contracts.insert(contract.clone());
        self.events.emit(Event::ContractCreated {
            contract_id: contract.id,
            landlord_id: contract.landlord_id,
            monthly_amount: contract.monthly_amount,
            payout_type: contract.payout_type,
            first_due,
            timestamp: time_provider.now(),
        });

        Ok(contract)
    }

    /// create a contract for a tenant transitioning from a lease elsewhere
    ///
    /// Deferred-payout landlords get a longer lead window (6 months vs 3)
    /// so the lump sum is funded before the old lease lapses. A transition
    /// window that has already opened means the tenant starts paying today.
    pub fn create_for_existing_tenant(
        &self,
        terms: ExistingTenantTerms,
        time_provider: &SafeTimeProvider,
    ) -> Result<Contract> {
        let today = time_provider.now().date_naive();
        if terms.current_lease_expiry <= today {
            return Err(RentError::InvalidRange {
                message: format!(
                    "current lease expiry {} must be in the future",
                    terms.current_lease_expiry
                ),
            });
        }

        self.validate_parties(
            terms.tenant_id,
            terms.landlord_id,
            terms.property_id,
            terms.unit_id,
        )?;
        self.validate_amount(terms.monthly_amount)?;
        self.reject_duplicate(terms.tenant_id, terms.property_id, terms.unit_id)?;

        let lead = self.config.lead_months(terms.payout_type);
        let start = dates::transition_start(today, terms.current_lease_expiry, lead);
        let first_due = dates::first_due_on_or_after(start);
        let lease_end = terms.new_lease_end.unwrap_or(
            terms.current_lease_expiry
                + chrono::Months::new(self.config.default_lease_extension_months),
        );
        if lease_end <= start {
            return Err(RentError::InvalidRange {
                message: format!(
                    "new lease end {} must be after transition start {}",
                    lease_end, start
                ),
            });
        }

        let contract = self.build_contract(
            &terms.tenant_id,
            &terms.landlord_id,
            &terms.property_id,
            &terms.unit_id,
            terms.monthly_amount,
            start,
            lease_end,
            terms.payout_type,
            first_due,
            start,
            true,
            Some(terms.current_lease_expiry),
            time_provider,
        );

        self.contracts.insert(contract.clone());
        self.events.emit(Event::ContractCreated {
            contract_id: contract.id,
            landlord_id: contract.landlord_id,
            monthly_amount: contract.monthly_amount,
            payout_type: contract.payout_type,
            first_due,
            timestamp: time_provider.now(),
        });

        Ok(contract)
    }

    /// apply partial field updates; rejected once the contract is terminal
    pub fn update_contract(
        &self,
        id: ContractId,
        update: ContractUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Contract> {
        if let Some(amount) = update.monthly_amount {
            self.validate_amount(amount)?;
        }

        let now = time_provider.now();
        let updated = self.contracts.update(id, |contract| {
            if contract.status.is_terminal() {
                return Err(RentError::NotActive {
                    status: contract.status,
                });
            }
            if let Some(amount) = update.monthly_amount {
                contract.monthly_amount = amount;
            }
            if let Some(lease_end) = update.lease_end {
                if lease_end <= contract.lease_start {
                    return Err(RentError::InvalidRange {
                        message: format!(
                            "lease end {} must be after lease start {}",
                            lease_end, contract.lease_start
                        ),
                    });
                }
                contract.lease_end = lease_end;
            }
            if let Some(payout_type) = update.payout_type {
                contract.payout_type = payout_type;
            }
            contract.updated_at = now;
            Ok(contract.clone())
        })?;

        self.events.emit(Event::ContractUpdated {
            contract_id: id,
            timestamp: now,
        });

        Ok(updated)
    }

    /// terminate a contract; one-way, and a no-op on terminal states
    pub fn terminate_contract(
        &self,
        id: ContractId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Contract> {
        let now = time_provider.now();
        let (contract, transitioned) = self.contracts.update(id, |contract| {
            if contract.status.is_terminal() {
                return Ok((contract.clone(), false));
            }
            contract.status = ContractStatus::Terminated;
            contract.updated_at = now;
            Ok((contract.clone(), true))
        })?;

        if transitioned {
            self.events.emit(Event::ContractTerminated {
                contract_id: id,
                timestamp: now,
            });
        }

        Ok(contract)
    }

    /// sweep active contracts whose lease end has passed into Expired
    pub fn expire_lapsed(&self, time_provider: &SafeTimeProvider) -> Vec<ContractId> {
        let now = time_provider.now();
        let today = now.date_naive();
        let mut expired = Vec::new();

        for contract in self.contracts.active_contracts() {
            if contract.lease_end < today {
                let result = self.contracts.update(contract.id, |c| {
                    if c.status == ContractStatus::Active && c.lease_end < today {
                        c.status = ContractStatus::Expired;
                        c.updated_at = now;
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                });
                if let Ok(true) = result {
                    expired.push(contract.id);
                    self.events.emit(Event::ContractExpired {
                        contract_id: contract.id,
                        lease_end: contract.lease_end,
                        timestamp: now,
                    });
                }
            }
        }

        expired
    }

    fn validate_parties(
        &self,
        tenant: TenantId,
        landlord: LandlordId,
        property: PropertyId,
        unit: UnitId,
    ) -> Result<()> {
        if !self.directory.is_tenant(tenant) {
            return Err(RentError::NotFound {
                entity: "tenant",
                id: tenant.to_string(),
            });
        }
        if !self.directory.is_landlord(landlord) {
            return Err(RentError::NotFound {
                entity: "landlord",
                id: landlord.to_string(),
            });
        }
        match self.directory.property_owner(property) {
            None => {
                return Err(RentError::NotFound {
                    entity: "property",
                    id: property.to_string(),
                });
            }
            Some(owner) if owner != landlord => {
                return Err(RentError::InvalidInput {
                    message: format!("property {} is not owned by landlord {}", property, landlord),
                });
            }
            Some(_) => {}
        }
        if !self.directory.unit_in_property(unit, property) {
            return Err(RentError::NotFound {
                entity: "unit",
                id: unit.to_string(),
            });
        }
        Ok(())
    }

    fn validate_amount(&self, amount: Money) -> Result<()> {
        if amount.is_negative() {
            return Err(RentError::InvalidInput {
                message: format!("monthly amount {} must not be negative", amount),
            });
        }
        Ok(())
    }

    fn reject_duplicate(&self, tenant: TenantId, property: PropertyId, unit: UnitId) -> Result<()> {
        if self.contracts.find_active(tenant, property, unit).is_some() {
            return Err(RentError::DuplicateContract { tenant, unit });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build_contract(
        &self,
        tenant: &TenantId,
        landlord: &LandlordId,
        property: &PropertyId,
        unit: &UnitId,
        monthly_amount: Money,
        lease_start: NaiveDate,
        lease_end: NaiveDate,
        payout_type: PayoutType,
        first_due: NaiveDate,
        transition_start: NaiveDate,
        existing_tenant: bool,
        original_expiry: Option<NaiveDate>,
        time_provider: &SafeTimeProvider,
    ) -> Contract {
        let now = time_provider.now();
        Contract {
            id: Uuid::new_v4(),
            tenant_id: *tenant,
            landlord_id: *landlord,
            property_id: *property,
            unit_id: *unit,
            monthly_amount,
            lease_start,
            lease_end,
            payout_type,
            next_payment_due: first_due,
            status: ContractStatus::Active,
            existing_tenant,
            original_expiry,
            transition_start,
            created_at: now,
            updated_at: now,
        }
    }
}
