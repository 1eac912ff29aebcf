//! Administrator accounts: a login in the identity provider plus an ADMIN profile.

use validator::Validate;

use crate::db::models::Profile;
use crate::db::types::Role;
use crate::repositories::store::{NewProfile, SurveyStore};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::identity::IdentityProvider;
use crate::services::saga::Saga;

pub(crate) const ADMIN_NOT_FOUND: &str = "Admin not found";

#[derive(Debug, Clone, Validate)]
pub(crate) struct CreateAdminInput {
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub(crate) password: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
}

pub(crate) struct AdminService<'a> {
    store: &'a dyn SurveyStore,
    identity: &'a dyn IdentityProvider,
}

impl<'a> AdminService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore, identity: &'a dyn IdentityProvider) -> Self {
        Self { store, identity }
    }

    /// Newest first.
    pub(crate) async fn list(&self) -> ServiceResult<Vec<Profile>> {
        self.store.list_profiles_by_role(Role::Admin).await.or_internal("fetch admins")
    }

    pub(crate) async fn create(&self, input: CreateAdminInput) -> ServiceResult<Profile> {
        input.validate().map_err(|err| ServiceError::Validation(err.to_string()))?;

        let mut saga = Saga::new("create_admin");
        let user = saga
            .run("create login", self.identity.create_user(&input.email, &input.password))
            .await
            .map_err(|err| ServiceError::Validation(format!("Failed to create user: {err}")))?;
        let identity = self.identity;
        let user_id = user.id.clone();
        saga.on_rollback("delete login", move || async move {
            identity.delete_user(&user_id).await.map(|_| ())
        });

        let profile = saga
            .run(
                "create profile",
                self.store.insert_profile(NewProfile {
                    id: user.id,
                    email: user.email,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    role: Role::Admin,
                }),
            )
            .await
            .or_internal("create admin profile")?;
        saga.commit();

        tracing::info!(admin_id = %profile.id, "Admin created");
        Ok(profile)
    }

    /// Removes another admin's login and profile. Returns the removed profile.
    pub(crate) async fn delete(&self, caller_id: &str, id: &str) -> ServiceResult<Profile> {
        if caller_id == id {
            return Err(ServiceError::InvalidState("Cannot delete your own account".to_string()));
        }
        let profile = self
            .store
            .find_profile(id)
            .await
            .or_internal("load admin")?
            .filter(|profile| profile.role == Role::Admin)
            .ok_or_else(|| ServiceError::NotFound(ADMIN_NOT_FOUND.to_string()))?;

        self.identity.delete_user(id).await.or_internal("delete admin login")?;
        self.store.delete_profile(id).await.or_internal("delete admin profile")?;

        tracing::info!(admin_id = %id, "Admin deleted");
        Ok(profile)
    }

    /// Creates the bootstrap admin unless a login for `email` already exists.
    pub(crate) async fn ensure(&self, email: &str, password: &str) -> ServiceResult<bool> {
        let existing =
            self.identity.find_user_by_email(email).await.or_internal("look up admin login")?;
        if let Some(user) = existing {
            if self.store.find_profile(&user.id).await.or_internal("load admin")?.is_none() {
                self.store
                    .insert_profile(NewProfile {
                        id: user.id,
                        email: user.email,
                        first_name: None,
                        last_name: None,
                        role: Role::Admin,
                    })
                    .await
                    .or_internal("create admin profile")?;
            }
            return Ok(false);
        }

        self.create(CreateAdminInput {
            email: email.to_string(),
            password: password.to_string(),
            first_name: Some("Admin".to_string()),
            last_name: None,
        })
        .await?;
        Ok(true)
    }
}
