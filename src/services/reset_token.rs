//! Signed, time-limited password-reset tokens (HS256 JWT).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    reset_password: String,
    exp: i64,
}

#[derive(Clone)]
pub struct ResetTokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in_secs: i64,
}

impl ResetTokenSigner {
    #[must_use]
    pub fn new(secret: &[u8], expires_in_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expires_in_secs,
        }
    }

    /// Token carrying `userid`, valid for the configured lifetime.
    pub fn issue(&self, userid: &str) -> jsonwebtoken::errors::Result<String> {
        self.issue_with_expiry(userid, Utc::now().timestamp() + self.expires_in_secs)
    }

    fn issue_with_expiry(&self, userid: &str, exp: i64) -> jsonwebtoken::errors::Result<String> {
        let claims = ResetClaims {
            reset_password: userid.to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// The user id in `token`, or `None` when it is forged, malformed or expired.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<String> {
        decode::<ResetClaims>(token, &self.decoding_key, &self.validation)
            .ok()
            .map(|data| data.claims.reset_password)
    }
}
