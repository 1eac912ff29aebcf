use crate::core::state::AppState;
use crate::services::admins::AdminService;

/// Creates the first administrator from `FIRST_ADMIN_EMAIL`/`FIRST_ADMIN_PASSWORD`
/// unless a login with that email already exists.
pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let created = AdminService::new(state.store(), state.identity())
        .ensure(&admin.first_admin_email, &admin.first_admin_password)
        .await?;

    if created {
        tracing::info!(email = %admin.first_admin_email, "Created first admin");
    } else {
        tracing::info!("First admin already present");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ensure_first_admin;
    use crate::core::config::Settings;
    use crate::repositories::store::DirectoryStore;
    use crate::test_support::{self, MemoryIdentity, MemoryStore};

    #[tokio::test]
    async fn first_admin_is_created_once_from_settings() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("FIRST_ADMIN_EMAIL", "root@school.cz");
        std::env::set_var("FIRST_ADMIN_PASSWORD", "root-pass");
        let settings = Settings::load();
        std::env::remove_var("FIRST_ADMIN_EMAIL");
        std::env::remove_var("FIRST_ADMIN_PASSWORD");

        let store = Arc::new(MemoryStore::default());
        let identity = Arc::new(MemoryIdentity::default());
        let state =
            test_support::build_state(settings.expect("settings"), store.clone(), identity.clone());

        ensure_first_admin(&state).await.expect("bootstrap");
        ensure_first_admin(&state).await.expect("second bootstrap");

        assert_eq!(identity.password_of("root@school.cz").as_deref(), Some("root-pass"));
        let profile = store.find_profile_by_email("root@school.cz").await.unwrap();
        assert!(profile.is_some());
        assert_eq!(store.all_profiles().len(), 1);
    }

    #[tokio::test]
    async fn short_password_is_rejected_without_creating_a_login() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("FIRST_ADMIN_EMAIL", "root@school.cz");
        std::env::set_var("FIRST_ADMIN_PASSWORD", "pw");
        let settings = Settings::load();
        std::env::remove_var("FIRST_ADMIN_EMAIL");
        std::env::remove_var("FIRST_ADMIN_PASSWORD");

        let store = Arc::new(MemoryStore::default());
        let identity = Arc::new(MemoryIdentity::default());
        let state =
            test_support::build_state(settings.expect("settings"), store.clone(), identity.clone());

        let err = ensure_first_admin(&state).await.unwrap_err();

        assert!(err.to_string().contains("at least 6 characters"), "{err}");
        assert!(!identity.has_user("root@school.cz"));
        assert!(store.all_profiles().is_empty());
    }

    #[tokio::test]
    async fn missing_password_skips_bootstrap() {
        let ctx = test_support::setup_test_context().await;

        ensure_first_admin(&ctx.state).await.expect("skip");

        assert!(ctx.store.all_profiles().is_empty());
    }
}
