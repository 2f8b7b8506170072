use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 webhook signing against a shared secret, hex-encoded.
///
/// Verification runs before any business logic; a mismatch is treated as a
/// potential security incident by the caller.
#[derive(Debug, Clone)]
pub struct WebhookSignature {
    secret: Vec<u8>,
}

impl WebhookSignature {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// hex digest of the raw body
    pub fn sign(&self, raw_body: &[u8]) -> String {
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            // new_from_slice accepts any key length for HMAC
            Err(_) => return String::new(),
        };
        mac.update(raw_body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// constant-time check of a hex signature header against the raw body
    pub fn verify(&self, signature_hex: &str, raw_body: &[u8]) -> bool {
        let Ok(provided) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(raw_body);
        mac.verify_slice(&provided).is_ok()
    }
}
