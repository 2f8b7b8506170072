use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::errors::{RentError, Result};
use crate::events::{Event, EventStore};
use crate::gateway::PaymentGateway;
use crate::payments::PaymentStore;
use crate::router::PaymentRouter;
use crate::types::PaymentStatus;

/// acknowledgement returned to the gateway
///
/// The gate acknowledges quickly even when processing fails, so the
/// gateway's own retry machinery is never provoked; failed events are
/// reconciled asynchronously from the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    /// event passed authentication and was examined
    pub accepted: bool,
    /// business processing ran to completion in this call
    pub processed: bool,
    /// event referenced an already-settled payment (idempotent replay)
    pub duplicate: bool,
}

impl WebhookAck {
    fn ignored() -> Self {
        Self {
            accepted: true,
            processed: false,
            duplicate: false,
        }
    }

    fn processed() -> Self {
        Self {
            accepted: true,
            processed: true,
            duplicate: false,
        }
    }

    fn duplicate() -> Self {
        Self {
            accepted: true,
            processed: false,
            duplicate: true,
        }
    }
}

/// inbound gateway notification body
#[derive(Debug, Clone, Deserialize)]
struct GatewayEvent {
    event: String,
    data: GatewayEventData,
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayEventData {
    reference: String,
    #[allow(dead_code)]
    #[serde(default)]
    amount: Option<i64>,
    #[allow(dead_code)]
    #[serde(default)]
    status: Option<String>,
}

/// authenticates inbound gateway notifications and enforces exactly-once
/// processing before the payment router runs
pub struct WebhookGate {
    router: Arc<PaymentRouter>,
    payments: Arc<PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    pub events: EventStore,
}

impl WebhookGate {
    pub fn new(
        router: Arc<PaymentRouter>,
        payments: Arc<PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            router,
            payments,
            gateway,
            events: EventStore::new(),
        }
    }

    /// verify, deduplicate, and dispatch one webhook delivery
    ///
    /// Signature verification happens before anything else; a mismatch is
    /// the only path that refuses acknowledgement.
    pub fn handle(
        &self,
        signature_header: &str,
        raw_body: &[u8],
        time_provider: &SafeTimeProvider,
    ) -> Result<WebhookAck> {
        if !self.gateway.verify_webhook_signature(signature_header, raw_body) {
            warn!("webhook signature mismatch, possible forgery attempt");
            self.events.emit(Event::WebhookRejected {
                reason: "signature verification failed".to_string(),
                timestamp: time_provider.now(),
            });
            return Err(RentError::Unauthorized);
        }

        let parsed: GatewayEvent = match serde_json::from_slice(raw_body) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "authenticated webhook body failed to parse");
                self.events.emit(Event::WebhookProcessingFailed {
                    reference: String::new(),
                    reason: format!("malformed body: {}", err),
                    timestamp: time_provider.now(),
                });
                return Ok(WebhookAck::ignored());
            }
        };

        if parsed.event != "charge.success" {
            return Ok(WebhookAck::ignored());
        }

        let reference = parsed.data.reference;
        if let Some(payment) = self.payments.find_by_reference(&reference) {
            if payment.status == PaymentStatus::Paid {
                return Ok(WebhookAck::duplicate());
            }
        }

        match self.router.complete_payment(&reference, time_provider) {
            Ok(outcome) if outcome.replayed => Ok(WebhookAck::duplicate()),
            Ok(_) => Ok(WebhookAck::processed()),
            Err(err) => {
                warn!(reference = %reference, error = %err, "webhook processing failed");
                self.events.emit(Event::WebhookProcessingFailed {
                    reference,
                    reason: err.to_string(),
                    timestamp: time_provider.now(),
                });
                Ok(WebhookAck::ignored())
            }
        }
    }
}
