//! Shopify webhook signature verification.

use crate::utils::error::{Result, SyncError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 以共享密鑰驗證 `X-Shopify-Hmac-Sha256` 標頭
#[derive(Clone)]
pub struct WebhookAuthenticator {
    secret: Vec<u8>,
}

impl std::fmt::Debug for WebhookAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuthenticator")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Base64 encoded HMAC-SHA256 of the raw body.
    pub fn sign(&self, body: &[u8]) -> String {
        STANDARD.encode(self.mac_for(body).finalize().into_bytes())
    }

    /// Checks the header against the body. The digest comparison runs in constant time.
    pub fn verify(&self, body: &[u8], header: Option<&str>) -> Result<()> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SyncError::SignatureError {
                message: "missing signature header".to_string(),
            })?;

        let provided = STANDARD
            .decode(header)
            .map_err(|_| SyncError::SignatureError {
                message: "signature header is not valid base64".to_string(),
            })?;

        self.mac_for(body)
            .verify_slice(&provided)
            .map_err(|_| SyncError::SignatureError {
                message: "signature mismatch".to_string(),
            })
    }

    fn mac_for(&self, body: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take any size key");
        mac.update(body);
        mac
    }
}
