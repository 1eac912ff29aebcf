use async_graphql::Context;
use axum::http::{header, HeaderMap};

use crate::api::errors::{GqlResult, IntoGql};
use crate::core::state::AppState;
use crate::db::models::Profile;
use crate::db::types::Role;
use crate::services::auth::{ADMIN_REQUIRED, STUDENT_REQUIRED};
use crate::services::error::{ServiceError, ServiceResult};

/// Caller identity resolved once per request. A missing or invalid bearer token
/// yields an anonymous context rather than a failure.
#[derive(Debug, Clone, Default)]
pub(crate) struct AuthContext {
    pub(crate) user: Option<Profile>,
    pub(crate) token: Option<String>,
}

impl AuthContext {
    pub(crate) async fn from_headers(state: &AppState, headers: &HeaderMap) -> Self {
        let Some(token) = bearer_token(headers) else {
            return Self::default();
        };

        let user_id = match state.identity().verify_access_token(token) {
            Ok(user_id) => user_id,
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring invalid access token");
                return Self::default();
            }
        };

        match state.store().find_profile(&user_id).await {
            Ok(Some(profile)) => Self { user: Some(profile), token: Some(token.to_string()) },
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "Access token without profile");
                Self::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load caller profile");
                Self::default()
            }
        }
    }

    pub(crate) fn require_auth(&self) -> ServiceResult<&Profile> {
        self.user.as_ref().ok_or_else(ServiceError::not_authenticated)
    }

    pub(crate) fn require_admin(&self) -> ServiceResult<&Profile> {
        let user = self.require_auth()?;
        match user.role {
            Role::Admin => Ok(user),
            Role::Student => Err(ServiceError::Forbidden(ADMIN_REQUIRED.to_string())),
        }
    }

    pub(crate) fn require_student(&self) -> ServiceResult<&Profile> {
        let user = self.require_auth()?;
        match user.role {
            Role::Student => Ok(user),
            Role::Admin => Err(ServiceError::Forbidden(STUDENT_REQUIRED.to_string())),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Per-request data access for resolvers.
pub(crate) trait ContextExt {
    fn app_state(&self) -> GqlResult<&AppState>;
    fn auth(&self) -> GqlResult<&AuthContext>;

    fn require_auth(&self) -> GqlResult<&Profile> {
        self.auth()?.require_auth().gql()
    }

    fn require_admin(&self) -> GqlResult<&Profile> {
        self.auth()?.require_admin().gql()
    }

    fn require_student(&self) -> GqlResult<&Profile> {
        self.auth()?.require_student().gql()
    }
}

impl ContextExt for Context<'_> {
    fn app_state(&self) -> GqlResult<&AppState> {
        self.data::<AppState>()
    }

    fn auth(&self) -> GqlResult<&AuthContext> {
        self.data::<AuthContext>()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, HeaderValue};

    use super::{bearer_token, AuthContext};
    use crate::db::types::Role;
    use crate::services::error::ServiceError;
    use crate::test_support;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn invalid_tokens_resolve_to_anonymous() {
        let ctx = test_support::setup_test_context().await;

        let auth = AuthContext::from_headers(&ctx.state, &headers("Bearer nonsense")).await;

        assert!(auth.user.is_none());
        assert_eq!(auth.require_auth().unwrap_err(), ServiceError::not_authenticated());
    }

    #[tokio::test]
    async fn roles_gate_admin_and_student_access() {
        let ctx = test_support::setup_test_context().await;
        let (_, admin_token) = ctx.login_as("admin@school.cz", Role::Admin).await;
        let (_, student_token) = ctx.login_as("alice@school.cz", Role::Student).await;

        let admin =
            AuthContext::from_headers(&ctx.state, &headers(&format!("Bearer {admin_token}"))).await;
        let student =
            AuthContext::from_headers(&ctx.state, &headers(&format!("Bearer {student_token}")))
                .await;

        assert!(admin.require_admin().is_ok());
        assert!(matches!(admin.require_student(), Err(ServiceError::Forbidden(_))));
        assert!(student.require_student().is_ok());
        assert!(matches!(student.require_admin(), Err(ServiceError::Forbidden(_))));
        assert_eq!(student.token.as_deref(), Some(student_token.as_str()));
    }
}
