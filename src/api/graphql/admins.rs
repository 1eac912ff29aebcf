use async_graphql::{Context, ErrorExtensions, Object};

use crate::api::errors::{respond, GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::schemas::auth::{AdminList, AdminPayload, UserView};
use crate::services::admins::{AdminService, CreateAdminInput};
use crate::services::error::ServiceError;

#[derive(Default)]
pub(crate) struct AdminQuery;

#[Object]
impl AdminQuery {
    async fn list_admins(&self, ctx: &Context<'_>) -> GqlResult<AdminList> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let admins = AdminService::new(state.store(), state.identity()).list().await.gql()?;
        let admins: Vec<UserView> = admins.into_iter().map(Into::into).collect();
        Ok(AdminList { total: admins.len() as i64, admins })
    }
}

#[derive(Default)]
pub(crate) struct AdminMutation;

#[Object]
impl AdminMutation {
    async fn create_admin(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> GqlResult<AdminPayload> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        let input = CreateAdminInput { email, password, first_name, last_name };
        let outcome = AdminService::new(state.store(), state.identity()).create(input).await;

        respond(outcome, "Admin created successfully", |success, message, admin| AdminPayload {
            success,
            message,
            admin: admin.map(Into::into),
        })
    }

    /// Deleting your own account is rejected outright; a missing admin is
    /// reported in the payload.
    async fn delete_admin(&self, ctx: &Context<'_>, id: String) -> GqlResult<AdminPayload> {
        let caller = ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            AdminService::new(state.store(), state.identity()).delete(&caller.id, &id).await;

        match outcome {
            Ok(admin) => Ok(AdminPayload {
                success: true,
                message: "Admin deleted successfully".to_string(),
                admin: Some(admin.into()),
            }),
            Err(err) if err.is_internal() || matches!(err, ServiceError::InvalidState(_)) => {
                Err(err.extend())
            }
            Err(err) => Ok(AdminPayload { success: false, message: err.to_string(), admin: None }),
        }
    }
}
