use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod identity;
pub mod step_up;
pub mod super_admin;

pub use identity::{IdentityProvider, JwtIdentityProvider};
pub use step_up::requires_elevated_assurance;
pub use super_admin::{is_super_admin, super_admin_decision, SuperAdminDecision, SUPER_ADMIN_ROLE};

/// Opaque bearer token for one inbound request. Never cached past the request.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// Authenticated principal as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            app_metadata: Map::new(),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.app_metadata.insert("role".to_string(), Value::String(role.to_string()));
        self
    }

    /// The `role` claim from app metadata, if it is a string.
    pub fn role(&self) -> Option<&str> {
        self.app_metadata.get("role").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssuranceLevel {
    Aal1,
    Aal2,
}

/// Assurance the session has reached versus what the caller's account demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssuranceLevels {
    pub current: AssuranceLevel,
    pub next: AssuranceLevel,
}

/// JWT claims issued at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub iat: i64,
    #[serde(default = "default_aal")]
    pub aal: AssuranceLevel,
    #[serde(default)]
    pub amr: Vec<String>,
}

fn default_aal() -> AssuranceLevel {
    AssuranceLevel::Aal1
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Collapses every identity failure into `Unauthenticated` so callers fail closed.
    pub fn into_unauthenticated(self) -> Self {
        match self {
            AuthError::Unauthenticated(msg) => AuthError::Unauthenticated(msg),
            AuthError::InvalidToken(msg) | AuthError::Provider(msg) => AuthError::Unauthenticated(msg),
        }
    }
}

/// Validates signature and expiry and returns the session claims.
pub fn decode_session(
    session: &Session,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<SessionClaims, AuthError> {
    if session.token().trim().is_empty() {
        return Err(AuthError::InvalidToken("empty token".to_string()));
    }
    decode::<SessionClaims>(session.token(), key, validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
