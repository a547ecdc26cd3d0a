use super::{AssuranceLevel, AuthError, IdentityProvider, Session};

/// True when the caller has enrolled a second factor but this session has not used it.
///
/// Evaluated on every call. Any failure to read the assurance state is reported as
/// `Unauthenticated`; it never degrades to `false`.
pub async fn requires_elevated_assurance(
    identity: &dyn IdentityProvider,
    session: &Session,
) -> Result<bool, AuthError> {
    let levels = identity
        .assurance_levels(session)
        .await
        .map_err(AuthError::into_unauthenticated)?;

    Ok(levels.next == AssuranceLevel::Aal2 && levels.current != AssuranceLevel::Aal2)
}
