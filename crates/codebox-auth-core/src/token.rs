//! Signed admin tokens
//!
//! Wire format: `<header>.<payload>.<signature>`, each segment standard
//! padded base64. The header is fixed, the payload is the caller's claims
//! with an injected `exp` (Unix seconds), and the signature is
//! HMAC-SHA256 over the literal `<header>.<payload>` text.
//!
//! The layout resembles a JWT but is only ever read back by this process;
//! no algorithm negotiation happens and the header is not inspected on
//! verification.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::crypto::{constant_time_str_eq, HmacKey, HmacKeyError};
use crate::TokenError;

/// Default token lifetime: 30 days
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Fixed header segment, before base64
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Separator between the three segments
const SEPARATOR: char = '.';

/// Claim carrying the expiry timestamp
pub const EXP_CLAIM: &str = "exp";

/// Claim granting admin rights
pub const IS_ADMIN_CLAIM: &str = "is_admin";

/// Open key/value payload carried by a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Empty claims
    pub fn new() -> Self {
        Self::default()
    }

    /// `{is_admin: true}`
    pub fn admin() -> Self {
        let mut claims = Self::new();
        claims.insert(IS_ADMIN_CLAIM, true);
        claims
    }

    /// Set a claim, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a claim
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `true` only when `is_admin` is present and the JSON boolean `true`.
    ///
    /// A correctly signed token without the claim is a valid non-admin
    /// token, not an error.
    ///
    /// # Note
    /// Whether signed tokens lacking `is_admin` should instead be rejected
    /// outright is still open; this stays permissive until that is settled.
    pub fn is_admin(&self) -> bool {
        self.0
            .get(IS_ADMIN_CLAIM)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Expiry timestamp, if present and an integer within `i64`
    pub fn exp(&self) -> Option<i64> {
        self.0.get(EXP_CLAIM).and_then(Value::as_i64)
    }

    /// Number of claims, `exp` included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A token split into its three encoded segments.
///
/// Borrowed from the input string; nothing is decoded or verified yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedToken<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
    signing_input: &'a str,
}

impl<'a> SignedToken<'a> {
    /// Split a token into exactly three segments.
    ///
    /// `.` is outside the base64 alphabet, so the split is unambiguous.
    pub fn parse(token: &'a str) -> Result<Self, TokenError> {
        let mut parts = token.split(SEPARATOR);
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected 3 segments".to_string()));
        };

        // header.len() + 1 + payload.len() is always a char boundary
        let signing_input = &token[..header.len() + 1 + payload.len()];

        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    /// The `<header>.<payload>` text the signature covers
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }
}

/// Issues and verifies admin tokens with a process-wide secret.
///
/// The key and clock are fixed at construction; clones share both.
#[derive(Clone)]
pub struct TokenCodec {
    key: HmacKey,
    clock: Arc<dyn Clock>,
    default_ttl_secs: i64,
}

impl TokenCodec {
    /// Create a codec using the wall clock and the default 30-day TTL
    pub fn new(key: HmacKey) -> Self {
        Self {
            key,
            clock: Arc::new(SystemClock),
            default_ttl_secs: DEFAULT_TOKEN_TTL.as_secs() as i64,
        }
    }

    /// Create a codec directly from the admin secret
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self, HmacKeyError> {
        Ok(Self::new(HmacKey::new(secret)?))
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the TTL used by [`TokenCodec::create`]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self
    }

    /// TTL used by [`TokenCodec::create`], in seconds
    pub fn default_ttl_secs(&self) -> i64 {
        self.default_ttl_secs
    }

    /// Issue a token valid for the default TTL
    pub fn create(&self, claims: &Claims) -> String {
        self.create_with_ttl(claims, self.default_ttl_secs)
    }

    /// Issue a token expiring `ttl_secs` from now.
    ///
    /// Any `exp` already present in `claims` is overwritten. A negative TTL
    /// yields a token that is already expired.
    pub fn create_with_ttl(&self, claims: &Claims, ttl_secs: i64) -> String {
        let mut payload = claims.as_map().clone();
        let exp = self.clock.now().saturating_add(ttl_secs);
        payload.insert(EXP_CLAIM.to_string(), Value::from(exp));

        let header_b64 = STANDARD.encode(HEADER_JSON);
        let payload_b64 = STANDARD.encode(Value::Object(payload).to_string());
        let signing_input = format!("{header_b64}{SEPARATOR}{payload_b64}");
        let signature_b64 = self.compute_signature(&signing_input);

        format!("{signing_input}{SEPARATOR}{signature_b64}")
    }

    /// Verify a token and return its full payload, `exp` included.
    ///
    /// The signature is checked before the payload is decoded. An absent
    /// `exp` counts as 0, so such tokens are always expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_inner(token).inspect_err(|e| {
            tracing::debug!(reason = e.kind_code(), "token verification failed");
        })
    }

    fn verify_inner(&self, token: &str) -> Result<Claims, TokenError> {
        let parts = SignedToken::parse(token)?;

        let expected = self.compute_signature(parts.signing_input());
        if !constant_time_str_eq(parts.signature, &expected) {
            return Err(TokenError::InvalidSignature);
        }

        let payload_json = STANDARD
            .decode(parts.payload)
            .map_err(|e| TokenError::Malformed(format!("payload is not base64: {e}")))?;

        let payload: Value = serde_json::from_slice(&payload_json)
            .map_err(|e| TokenError::Malformed(format!("payload is not JSON: {e}")))?;

        let Value::Object(map) = payload else {
            return Err(TokenError::Malformed(
                "payload is not a JSON object".to_string(),
            ));
        };
        let claims = Claims(map);

        // Any JSON number is accepted: floats and integers beyond i64 compare numerically
        let exp = match claims.get(EXP_CLAIM) {
            None => 0.0,
            Some(value) => value
                .as_f64()
                .ok_or_else(|| TokenError::Malformed("exp is not a number".to_string()))?,
        };

        if exp <= self.clock.now() as f64 {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn compute_signature(&self, signing_input: &str) -> String {
        STANDARD.encode(self.key.sign(signing_input.as_bytes()))
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &self.key)
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish_non_exhaustive()
    }
}
