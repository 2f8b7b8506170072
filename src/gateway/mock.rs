//! Configurable gateway double for router and webhook tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::errors::{RentError, Result};

use super::{ChargeInit, ChargeVerification, PaymentGateway, TransferReceipt, WebhookSignature};

pub struct MockGateway {
    signer: WebhookSignature,
    verifications: Mutex<HashMap<String, ChargeVerification>>,
    fail_transfers: AtomicBool,
    fail_verification: AtomicBool,
    rewrite_references: AtomicBool,
    transfers_initiated: AtomicU32,
}

impl MockGateway {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            signer: WebhookSignature::new(secret),
            verifications: Mutex::new(HashMap::new()),
            fail_transfers: AtomicBool::new(false),
            fail_verification: AtomicBool::new(false),
            rewrite_references: AtomicBool::new(false),
            transfers_initiated: AtomicU32::new(0),
        }
    }

    /// stub the verification result for a reference
    pub fn expect_verification(&self, reference: &str, verification: ChargeVerification) {
        if let Ok(mut verifications) = self.verifications.lock() {
            verifications.insert(reference.to_string(), verification);
        }
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_verification(&self, fail: bool) {
        self.fail_verification.store(fail, Ordering::SeqCst);
    }

    /// answer charge initialization with a processor-issued reference
    /// instead of echoing the requested one
    pub fn set_rewrite_references(&self, rewrite: bool) {
        self.rewrite_references.store(rewrite, Ordering::SeqCst);
    }

    pub fn transfers_initiated(&self) -> u32 {
        self.transfers_initiated.load(Ordering::SeqCst)
    }

    pub fn sign(&self, raw_body: &[u8]) -> String {
        self.signer.sign(raw_body)
    }
}

impl PaymentGateway for MockGateway {
    fn initialize_charge(
        &self,
        _payer_email: &str,
        _amount_minor: i64,
        reference: &str,
        _metadata: &serde_json::Value,
    ) -> Result<ChargeInit> {
        let reference = if self.rewrite_references.load(Ordering::SeqCst) {
            format!("psp-{}", reference)
        } else {
            reference.to_string()
        };
        Ok(ChargeInit {
            authorization_url: format!("https://checkout.test/{}", reference),
            reference,
        })
    }

    fn verify_charge(&self, reference: &str) -> Result<ChargeVerification> {
        if self.fail_verification.load(Ordering::SeqCst) {
            return Err(RentError::GatewayUnavailable {
                message: "verification endpoint timed out".to_string(),
            });
        }
        self.verifications
            .lock()
            .ok()
            .and_then(|verifications| verifications.get(reference).cloned())
            .ok_or(RentError::NotFound {
                entity: "charge",
                id: reference.to_string(),
            })
    }

    fn initiate_transfer(
        &self,
        _amount_minor: i64,
        recipient: &str,
        _reason: &str,
    ) -> Result<TransferReceipt> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(RentError::GatewayUnavailable {
                message: "transfer endpoint timed out".to_string(),
            });
        }
        let n = self.transfers_initiated.fetch_add(1, Ordering::SeqCst);
        Ok(TransferReceipt {
            transfer_code: format!("trf-{}-{}", recipient, n),
            status: "pending".to_string(),
        })
    }

    fn verify_webhook_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        self.signer.verify(signature, raw_body)
    }
}
