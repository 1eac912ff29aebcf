use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::store::SurveyStore;
use crate::services::identity::IdentityProvider;

/// Process-wide handles shared by every request. Holds no mutable state of its own.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    store: Arc<dyn SurveyStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        store: Arc<dyn SurveyStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, store, identity }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn store(&self) -> &dyn SurveyStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }
}
