use async_graphql::{Context, Object};

use crate::api::errors::{GqlResult, IntoGql};
use crate::api::guards::ContextExt;
use crate::db::types::ImportMode;
use crate::schemas::import::ImportResultView;
use crate::services::import_export::ImportExportService;

#[derive(Default)]
pub(crate) struct ExportQuery;

#[Object]
impl ExportQuery {
    /// Active enrollments as `ZAK;EMAIL;UCITEL;PREDMET` lines.
    async fn export_data(&self, ctx: &Context<'_>) -> GqlResult<String> {
        ctx.require_admin()?;
        let state = ctx.app_state()?;
        ImportExportService::new(state.store(), state.identity()).export().await.gql()
    }
}

#[derive(Default)]
pub(crate) struct ImportMutation;

#[Object]
impl ImportMutation {
    async fn import_data(
        &self,
        ctx: &Context<'_>,
        data: String,
        mode: ImportMode,
    ) -> GqlResult<ImportResultView> {
        let admin = ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome = ImportExportService::new(state.store(), state.identity())
            .import(&data, mode, &admin.id)
            .await;
        Ok(outcome.into())
    }

    async fn delete_all_data(&self, ctx: &Context<'_>) -> GqlResult<ImportResultView> {
        let admin = ctx.require_admin()?;
        let state = ctx.app_state()?;
        let outcome =
            ImportExportService::new(state.store(), state.identity()).delete_all(&admin.id).await;
        Ok(outcome.into())
    }
}
