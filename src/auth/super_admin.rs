use super::{requires_elevated_assurance, AuthError, Caller, IdentityProvider, Session};

pub const SUPER_ADMIN_ROLE: &str = "super-admin";

/// Outcome of the elevated-privilege gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SuperAdminDecision {
    Granted(Caller),
    Anonymous,
    StepUpRequired(Caller),
    NotSuperAdmin(Caller),
}

impl SuperAdminDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, SuperAdminDecision::Granted(_))
    }
}

/// Runs identity, then step-up, then role, in that order.
///
/// The step-up check runs before the role is looked at so an unverified session can
/// never be elevated. Identity errors are returned, not turned into a denial.
pub async fn super_admin_decision(
    identity: &dyn IdentityProvider,
    session: &Session,
) -> Result<SuperAdminDecision, AuthError> {
    let Some(caller) = identity.current_user(session).await? else {
        return Ok(SuperAdminDecision::Anonymous);
    };

    if requires_elevated_assurance(identity, session).await? {
        tracing::warn!("Super-admin check for {} blocked pending step-up", caller.id);
        return Ok(SuperAdminDecision::StepUpRequired(caller));
    }

    if caller.role() == Some(SUPER_ADMIN_ROLE) {
        tracing::debug!("Super-admin granted for {}", caller.id);
        Ok(SuperAdminDecision::Granted(caller))
    } else {
        Ok(SuperAdminDecision::NotSuperAdmin(caller))
    }
}

pub async fn is_super_admin(identity: &dyn IdentityProvider, session: &Session) -> Result<bool, AuthError> {
    Ok(super_admin_decision(identity, session).await?.is_granted())
}
