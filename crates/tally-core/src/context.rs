//! # Request Context
//!
//! Carries the acting user into every mutating call.
//!
//! There is no ambient "current user": the command layer resolves the session
//! into a [`RequestContext`] and passes it down explicitly. Writes that must
//! be attributed (ledger entries, sales) call [`RequestContext::require_actor`].

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{User, UserRole};

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>, role: UserRole) -> Self {
        Actor {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id.clone(), user.display_name.clone(), user.role)
    }
}

/// Per-call context. Cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    actor: Option<Actor>,
}

impl RequestContext {
    /// A context with no authenticated user. Reads work; attributed writes fail.
    pub fn anonymous() -> Self {
        RequestContext { actor: None }
    }

    pub fn for_actor(actor: Actor) -> Self {
        RequestContext { actor: Some(actor) }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Returns the acting user or `CoreError::Authentication`.
    ///
    /// ```rust
    /// use tally_core::{Actor, RequestContext, UserRole};
    ///
    /// let ctx = RequestContext::for_actor(Actor::new("u-1", "Ana", UserRole::Cashier));
    /// assert_eq!(ctx.require_actor().unwrap().user_id, "u-1");
    /// assert!(RequestContext::anonymous().require_actor().is_err());
    /// ```
    pub fn require_actor(&self) -> CoreResult<&Actor> {
        self.actor
            .as_ref()
            .ok_or_else(|| CoreError::authentication("no active session"))
    }

    /// Acting user id, if any. Used for log fields.
    pub fn user_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|a| a.user_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context_requires_actor() {
        let ctx = RequestContext::anonymous();
        assert!(matches!(ctx.require_actor(), Err(CoreError::Authentication(_))));
        assert_eq!(ctx.user_id(), None);
    }

    #[test]
    fn test_actor_context() {
        let ctx = RequestContext::for_actor(Actor::new("u-1", "Ana", UserRole::Admin));
        let actor = ctx.require_actor().unwrap();
        assert!(actor.is_admin());
        assert_eq!(ctx.user_id(), Some("u-1"));
    }
}
