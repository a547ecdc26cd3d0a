use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation};
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{decode_session, AssuranceLevel, AssuranceLevels, AuthError, Caller, Session};

/// Resolves who is behind a session. Implementations must not cache across calls.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for an anonymous session, `Err` when the session cannot be trusted.
    async fn current_user(&self, session: &Session) -> Result<Option<Caller>, AuthError>;

    async fn assurance_levels(&self, session: &Session) -> Result<AssuranceLevels, AuthError>;
}

/// Verifies HS256 session tokens and reads caller state fresh from the identity tables.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    pool: PgPool,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, leeway_secs: u64, pool: PgPool) -> Self {
        let mut validation = Validation::default();
        validation.leeway = leeway_secs;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            pool,
        }
    }

    fn subject(&self, session: &Session) -> Result<(Option<Uuid>, AssuranceLevel), AuthError> {
        let claims = decode_session(session, &self.decoding_key, &self.validation)?;
        let sub = match claims.sub.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(sub) => Some(
                Uuid::parse_str(sub).map_err(|_| AuthError::InvalidToken(format!("malformed subject '{}'", sub)))?,
            ),
        };
        Ok((sub, claims.aal))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn current_user(&self, session: &Session) -> Result<Option<Caller>, AuthError> {
        let (sub, _) = self.subject(session)?;
        let Some(user_id) = sub else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT id, app_metadata FROM auth_users WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database error resolving caller {}: {}", user_id, e);
                AuthError::Provider("failed to load user".to_string())
            })?;

        let row = row.ok_or_else(|| {
            tracing::warn!("Session subject {} has no active user", user_id);
            AuthError::Unauthenticated("user no longer exists".to_string())
        })?;

        let id: Uuid = row.try_get("id").map_err(|e| AuthError::Provider(e.to_string()))?;
        let metadata: Option<Value> = row
            .try_get("app_metadata")
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        let app_metadata = match metadata {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(Some(Caller {
            id: id.to_string(),
            app_metadata,
        }))
    }

    async fn assurance_levels(&self, session: &Session) -> Result<AssuranceLevels, AuthError> {
        let (sub, current) = self.subject(session)?;
        let Some(user_id) = sub else {
            return Err(AuthError::Unauthenticated("anonymous session".to_string()));
        };

        let verified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM auth_factors WHERE user_id = $1 AND status = 'verified'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error loading factors for {}: {}", user_id, e);
            AuthError::Provider("failed to load authentication factors".to_string())
        })?;

        let next = if verified > 0 { AssuranceLevel::Aal2 } else { AssuranceLevel::Aal1 };
        Ok(AssuranceLevels { current, next })
    }
}
