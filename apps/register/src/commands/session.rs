//! # Session Commands
//!
//! Signing a cashier in resolves their user record once; every later
//! command carries the resulting [`tally_core::RequestContext`].

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::{DbState, SessionState};
use tally_core::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub user_id: String,
    pub display_name: String,
    pub role: UserRole,
}

/// Resolves `user_id` into the session context.
///
/// Unknown or deactivated users fail with `AUTHENTICATION_ERROR` and leave
/// the register signed out.
pub async fn resolve_session(
    db: &DbState,
    session: &SessionState,
    user_id: String,
) -> ApiResponse<SessionDto> {
    debug!(user_id = %user_id, "resolve_session command");

    let result = db.inner().users().resolve_context(&user_id).await;
    let result = match result {
        Ok(ctx) => {
            let dto = ctx.actor().map(|actor| SessionDto {
                user_id: actor.user_id.clone(),
                display_name: actor.display_name.clone(),
                role: actor.role,
            });
            session.set_context(ctx);
            if let Some(dto) = &dto {
                info!(user_id = %dto.user_id, "Session started");
            }
            dto.ok_or_else(|| ApiError::internal("Session has no actor"))
        }
        Err(e) => {
            session.sign_out();
            Err(e.into())
        }
    };

    ApiResponse::from_result("resolve_session", result)
}

pub fn end_session(session: &SessionState) -> ApiResponse<()> {
    session.sign_out();
    ApiResponse::success(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::signed_in;

    #[tokio::test]
    async fn test_resolve_and_end_session() {
        let (db, session, _config) = signed_in().await;
        let user_id = session.context().user_id().unwrap().to_string();

        end_session(&session);
        assert!(session.context().actor().is_none());

        let dto = resolve_session(&db, &session, user_id.clone())
            .await
            .into_result()
            .unwrap();
        assert_eq!(dto.user_id, user_id);
        assert_eq!(dto.role, UserRole::Cashier);
        assert_eq!(session.context().user_id(), Some(user_id.as_str()));
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_sign_in() {
        let (db, session, _config) = signed_in().await;
        let user_id = session.context().user_id().unwrap().to_string();
        db.inner().users().deactivate(&user_id).await.unwrap();

        let res = resolve_session(&db, &session, user_id).await;
        assert_eq!(res.error.unwrap().code, ErrorCode::AuthenticationError);
        assert!(session.context().actor().is_none());
    }
}
