use async_graphql::{Context, Object};

use crate::api::errors::{respond, too_many_requests, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::core::state::AppState;
use crate::schemas::auth::{AuthPayload, ProfilePayload, UserView};
use crate::services::auth::{AuthService, ProfileUpdate, PROFILE_UPDATED};

/// Fixed-window login throttle per email. Redis outages let the attempt through.
async fn check_login_rate(state: &AppState, email: &str) -> GqlResult<()> {
    let limits = state.settings().auth();
    let key = format!("login:{}", email.trim().to_lowercase());
    match state
        .redis()
        .rate_limit(&key, limits.login_attempts_per_window, limits.login_window_seconds)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!(email = %email, "Login rate limit exceeded");
            Err(too_many_requests())
        }
        Err(err) => {
            tracing::warn!(error = %err, "Login rate limit check failed; allowing attempt");
            Ok(())
        }
    }
}

#[derive(Default)]
pub(crate) struct AuthQuery;

#[Object]
impl AuthQuery {
    /// The caller's profile; null for anonymous callers.
    async fn me(&self, ctx: &Context<'_>) -> GqlResult<Option<UserView>> {
        let Some(user) = ctx.auth()?.user.as_ref() else {
            return Ok(None);
        };
        let state = ctx.app_state()?;
        let profile = AuthService::new(state.store(), state.identity()).me(&user.id).await.gql()?;
        Ok(profile.map(Into::into))
    }
}

#[derive(Default)]
pub(crate) struct AuthMutation;

#[Object]
impl AuthMutation {
    async fn admin_login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<AuthPayload> {
        let state = ctx.app_state()?;
        check_login_rate(state, &email).await?;
        let session = AuthService::new(state.store(), state.identity())
            .admin_login(&email, &password)
            .await
            .gql()?;
        Ok(session.into())
    }

    /// Signs a student in, creating their login on first use.
    async fn student_login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<AuthPayload> {
        let state = ctx.app_state()?;
        check_login_rate(state, &email).await?;
        let session = AuthService::new(state.store(), state.identity())
            .student_login(&email, &password)
            .await
            .gql()?;
        Ok(session.into())
    }

    async fn refresh_token(
        &self,
        ctx: &Context<'_>,
        refresh_token: String,
    ) -> GqlResult<AuthPayload> {
        let state = ctx.app_state()?;
        let session = AuthService::new(state.store(), state.identity())
            .refresh(&refresh_token)
            .await
            .gql()?;
        Ok(session.into())
    }

    async fn logout(&self, ctx: &Context<'_>) -> GqlResult<bool> {
        ctx.require_auth()?;
        let state = ctx.app_state()?;
        let token = ctx.auth()?.token.clone().unwrap_or_default();
        Ok(AuthService::new(state.store(), state.identity()).logout(&token).await)
    }

    async fn update_admin_profile(
        &self,
        ctx: &Context<'_>,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> GqlResult<ProfilePayload> {
        let admin = ctx.require_admin()?;
        let state = ctx.app_state()?;
        let update = ProfileUpdate { first_name, last_name, email };
        let outcome = AuthService::new(state.store(), state.identity())
            .update_profile(&admin.id, update)
            .await;

        respond(outcome, PROFILE_UPDATED, |success, message, profile| ProfilePayload {
            success,
            message,
            user: profile.map(Into::into),
        })
    }
}
