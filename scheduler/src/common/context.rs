//! Explicit request context, passed by value rather than carried in
//! thread-local/ambient state, per the design note against hidden globals.

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;

/// Identity of the caller driving a scheduler/worker/orchestrator operation,
/// as resolved from a validated bearer token by the external identity
/// provider. `None` means the operation runs as the system itself (e.g. a
/// poller tick), not on behalf of an authenticated end user.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    principal: Option<AuthenticatedPrincipal>,
}

#[derive(Clone, Debug)]
pub struct AuthenticatedPrincipal {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub name: String,
}

impl RequestContext {
    pub fn system() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            principal: None,
        }
    }

    pub fn authenticated(principal: AuthenticatedPrincipal) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            principal: Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        self.principal.as_ref()
    }

    pub fn require_account(&self) -> Result<Uuid> {
        self.principal
            .as_ref()
            .map(|p| p.account_id)
            .ok_or_else(|| anyhow!("request context has no authenticated principal"))
    }

    pub fn require_account_matches(&self, account_id: Uuid) -> Result<()> {
        let actual = self.require_account()?;
        if actual != account_id {
            bail!("principal's account {actual} does not match requested account {account_id}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> AuthenticatedPrincipal {
        AuthenticatedPrincipal {
            user_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            email: "a@example.com".into(),
            name: "A".into(),
        }
    }

    #[test]
    fn system_context_has_no_principal() {
        let ctx = RequestContext::system();
        assert!(!ctx.is_authenticated());
        assert!(ctx.require_account().is_err());
    }

    #[test]
    fn authenticated_context_exposes_account() {
        let p = principal();
        let account_id = p.account_id;
        let ctx = RequestContext::authenticated(p);
        assert_eq!(ctx.require_account().unwrap(), account_id);
        assert!(ctx.require_account_matches(account_id).is_ok());
        assert!(ctx.require_account_matches(Uuid::new_v4()).is_err());
    }
}
