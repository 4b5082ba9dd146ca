use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checks the `X-Line-Signature` header: base64 HMAC-SHA256 of the raw body,
/// keyed with the channel secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    channel_secret: String,
}

impl SignatureVerifier {
    pub fn new(channel_secret: impl Into<String>) -> Self {
        Self {
            channel_secret: channel_secret.into(),
        }
    }

    /// Signature the platform would send for `body`.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.channel_secret.as_bytes()).ok()?;
        mac.update(body);
        Some(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let provided = match STANDARD.decode(signature.trim()) {
            Ok(value) => value,
            Err(_) => return false,
        };

        let mut mac = match HmacSha256::new_from_slice(self.channel_secret.as_bytes()) {
            Ok(value) => value,
            Err(_) => return false,
        };
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    }
}
