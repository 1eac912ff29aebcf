//! Sign-in flows for administrators and students, token refresh and profile edits.

use crate::db::models::Profile;
use crate::db::types::Role;
use crate::repositories::store::{NewProfile, ProfilePatch, SurveyStore};
use crate::services::directory::split_name;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::identity::{IdentityError, IdentityProvider, Session};
use crate::services::saga::Saga;

pub(crate) const ADMIN_REQUIRED: &str = "Unauthorized: Admin access required";
pub(crate) const STUDENT_REQUIRED: &str = "Unauthorized: Student access required";
pub(crate) const PROFILE_UPDATED: &str = "Profile updated successfully";
const INVALID_ADMIN_CREDENTIALS: &str = "Invalid email or password";
const INVALID_STUDENT_CREDENTIALS: &str = "Nesprávný email nebo heslo";

/// A signed-in user with the tokens of their new session.
#[derive(Debug, Clone)]
pub(crate) struct AuthSession {
    pub(crate) user: Profile,
    pub(crate) token: String,
    pub(crate) refresh_token: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ProfileUpdate {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) email: Option<String>,
}

fn student_credentials_rejected() -> ServiceError {
    ServiceError::Unauthenticated(INVALID_STUDENT_CREDENTIALS.to_string())
}

pub(crate) struct AuthService<'a> {
    store: &'a dyn SurveyStore,
    identity: &'a dyn IdentityProvider,
}

impl<'a> AuthService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore, identity: &'a dyn IdentityProvider) -> Self {
        Self { store, identity }
    }

    pub(crate) async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> ServiceResult<AuthSession> {
        let session = self.identity.sign_in(email, password).await.map_err(|err| match err {
            IdentityError::InvalidCredentials => {
                ServiceError::Unauthenticated(INVALID_ADMIN_CREDENTIALS.to_string())
            }
            other => ServiceError::internal(other, "sign in"),
        })?;
        let user = self.admin_profile(&session.user_id).await?;
        tracing::info!(user_id = %user.id, "Admin signed in");
        Ok(AuthSession { user, token: session.access_token, refresh_token: session.refresh_token })
    }

    async fn admin_profile(&self, user_id: &str) -> ServiceResult<Profile> {
        let profile = self
            .store
            .find_profile(user_id)
            .await
            .or_internal("load profile")?
            .ok_or_else(|| ServiceError::NotFound("User profile not found".to_string()))?;
        if profile.role != Role::Admin {
            return Err(ServiceError::Forbidden(ADMIN_REQUIRED.to_string()));
        }
        Ok(profile)
    }

    /// Signs a student in by the email on their student record. The first
    /// successful attempt for a student without a login creates one.
    pub(crate) async fn student_login(
        &self,
        email: &str,
        password: &str,
    ) -> ServiceResult<AuthSession> {
        let student = self
            .store
            .find_student_by_email(email)
            .await
            .or_internal("load student")?
            .ok_or_else(student_credentials_rejected)?;

        let session = match self.identity.sign_in(email, password).await {
            Ok(session) => session,
            Err(IdentityError::InvalidCredentials) => {
                self.provision_student_login(email, password, &student.name).await?
            }
            Err(err) => {
                tracing::warn!(error = %err, "Student sign-in failed");
                return Err(student_credentials_rejected());
            }
        };

        let (first_name, last_name) = split_name(&student.name);
        let user = Profile {
            id: session.user_id,
            email: email.to_string(),
            first_name: Some(if first_name.is_empty() { student.name.clone() } else { first_name }),
            last_name: Some(last_name),
            role: Role::Student,
            created_at: student.created_at,
            updated_at: student.updated_at,
        };
        tracing::info!(user_id = %user.id, student_id = %student.id, "Student signed in");
        Ok(AuthSession { user, token: session.access_token, refresh_token: session.refresh_token })
    }

    /// Creates the login and STUDENT profile and signs in with them, unless a
    /// login for `email` already exists (then the password was simply wrong).
    async fn provision_student_login(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> ServiceResult<Session> {
        let existing = self.identity.find_user_by_email(email).await.map_err(|err| {
            tracing::warn!(error = %err, "Login lookup failed");
            student_credentials_rejected()
        })?;
        if existing.is_some() {
            return Err(student_credentials_rejected());
        }

        let mut saga = Saga::new("provision_student_login");
        let user = saga
            .run("create login", self.identity.create_user(email, password))
            .await
            .map_err(|_| student_credentials_rejected())?;
        let identity = self.identity;
        let user_id = user.id.clone();
        saga.on_rollback("delete login", move || async move {
            identity.delete_user(&user_id).await.map(|_| ())
        });

        let (first_name, last_name) = split_name(name);
        let profile = NewProfile {
            id: user.id.clone(),
            email: email.to_string(),
            first_name: Some(if first_name.is_empty() { name.to_string() } else { first_name }),
            last_name: Some(last_name),
            role: Role::Student,
        };
        saga.run("create profile", self.store.insert_profile(profile))
            .await
            .map_err(|_| student_credentials_rejected())?;
        saga.commit();

        tracing::info!(user_id = %user.id, "Student login provisioned");
        self.identity.sign_in(email, password).await.map_err(|err| {
            tracing::warn!(error = %err, "Sign-in after provisioning failed");
            student_credentials_rejected()
        })
    }

    /// Rotates an administrator's refresh token.
    pub(crate) async fn refresh(&self, refresh_token: &str) -> ServiceResult<AuthSession> {
        let session = self.identity.refresh(refresh_token).await.map_err(|err| match err {
            IdentityError::InvalidRefreshToken => {
                ServiceError::Unauthenticated("Invalid or expired refresh token".to_string())
            }
            other => ServiceError::internal(other, "refresh session"),
        })?;
        let user = self.admin_profile(&session.user_id).await?;
        Ok(AuthSession { user, token: session.access_token, refresh_token: session.refresh_token })
    }

    /// Ends the session behind `access_token`. Always succeeds for the caller.
    pub(crate) async fn logout(&self, access_token: &str) -> bool {
        if let Err(err) = self.identity.sign_out(access_token).await {
            tracing::warn!(error = %err, "Sign-out failed");
        }
        true
    }

    pub(crate) async fn me(&self, user_id: &str) -> ServiceResult<Option<Profile>> {
        self.store.find_profile(user_id).await.or_internal("load profile")
    }

    /// Patches the caller's profile; an email change is carried over to the
    /// login, and the profile is restored when that fails.
    pub(crate) async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> ServiceResult<Profile> {
        let current = self
            .store
            .find_profile(user_id)
            .await
            .or_internal("load profile")?
            .ok_or_else(|| ServiceError::NotFound("User profile not found".to_string()))?;

        let mut saga = Saga::new("update_profile");
        let patch = ProfilePatch {
            email: update.email.clone(),
            first_name: update.first_name,
            last_name: update.last_name,
        };
        let updated = saga
            .run("update profile", self.store.update_profile(user_id, patch))
            .await
            .map_err(|_| ServiceError::Validation("Failed to update profile".to_string()))?
            .ok_or_else(|| ServiceError::Validation("Failed to update profile".to_string()))?;

        let email_change = update.email.filter(|email| *email != current.email);
        if let Some(email) = email_change {
            let store = self.store;
            let id = user_id.to_string();
            let restore = ProfilePatch {
                email: Some(current.email.clone()),
                first_name: current.first_name.clone(),
                last_name: current.last_name.clone(),
            };
            saga.on_rollback("restore profile", move || async move {
                store.update_profile(&id, restore).await.map(|_| ())
            });
            saga.run("update login email", self.identity.update_user(user_id, Some(&email), None))
                .await
                .map_err(|_| ServiceError::Validation("Failed to update email".to_string()))?;
        }
        saga.commit();

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::store::DirectoryStore;
    use crate::test_support::{seed_directory, MemoryIdentity, MemoryStore};

    #[tokio::test]
    async fn admin_login_rejects_bad_passwords_and_students() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        let dir = seed_directory(&store).await;
        identity.add_user(&dir.admin_user_id, "admin@school.cz", "admin-pass");
        identity.add_user(&dir.alice_user_id, "alice@school.cz", "alice-pass");
        let service = AuthService::new(&store, &identity);

        let err = service.admin_login("admin@school.cz", "wrong").await.unwrap_err();
        assert_eq!(err, ServiceError::Unauthenticated(INVALID_ADMIN_CREDENTIALS.to_string()));

        let err = service.admin_login("alice@school.cz", "alice-pass").await.unwrap_err();
        assert_eq!(err, ServiceError::Forbidden(ADMIN_REQUIRED.to_string()));

        let session = service.admin_login("admin@school.cz", "admin-pass").await.unwrap();
        assert_eq!(session.user.role, Role::Admin);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn first_student_login_provisions_an_account() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        seed_directory(&store).await;
        let service = AuthService::new(&store, &identity);

        let session = service.student_login("bob@school.cz", "bob-pass").await.unwrap();

        assert_eq!(session.user.first_name.as_deref(), Some("Bob"));
        assert_eq!(session.user.last_name.as_deref(), Some("Dvorak"));
        assert_eq!(session.user.role, Role::Student);
        let profile = store.find_profile(&session.user.id).await.unwrap().unwrap();
        assert_eq!(profile.email, "bob@school.cz");

        let err = service.student_login("bob@school.cz", "other").await.unwrap_err();
        assert_eq!(err, student_credentials_rejected());
    }

    #[tokio::test]
    async fn unknown_student_email_is_rejected_without_provisioning() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        seed_directory(&store).await;
        let service = AuthService::new(&store, &identity);

        let err = service.student_login("nobody@school.cz", "pw").await.unwrap_err();
        assert_eq!(err, student_credentials_rejected());
        assert!(!identity.has_user("nobody@school.cz"));
    }

    #[tokio::test]
    async fn provisioning_rolls_back_the_login_when_the_profile_fails() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        seed_directory(&store).await;
        store.fail_on("insert_profile");
        let service = AuthService::new(&store, &identity);

        let err = service.student_login("bob@school.cz", "bob-pass").await.unwrap_err();
        assert_eq!(err, student_credentials_rejected());
        assert!(!identity.has_user("bob@school.cz"));
    }

    #[tokio::test]
    async fn refresh_rotates_tokens_for_admins() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        let dir = seed_directory(&store).await;
        identity.add_user(&dir.admin_user_id, "admin@school.cz", "admin-pass");
        let service = AuthService::new(&store, &identity);
        let login = service.admin_login("admin@school.cz", "admin-pass").await.unwrap();

        let refreshed = service.refresh(&login.refresh_token).await.unwrap();
        assert_ne!(refreshed.refresh_token, login.refresh_token);

        let err = service.refresh(&login.refresh_token).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Unauthenticated("Invalid or expired refresh token".to_string())
        );
    }

    #[tokio::test]
    async fn failed_email_change_restores_the_profile() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        let dir = seed_directory(&store).await;
        identity.add_user(&dir.admin_user_id, "admin@school.cz", "admin-pass");
        identity.fail_updates();
        let service = AuthService::new(&store, &identity);

        let err = service
            .update_profile(
                &dir.admin_user_id,
                ProfileUpdate {
                    first_name: Some("Renamed".to_string()),
                    email: Some("new@school.cz".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err, ServiceError::Validation("Failed to update email".to_string()));
        let profile = store.find_profile(&dir.admin_user_id).await.unwrap().unwrap();
        assert_eq!(profile.email, "admin@school.cz");
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn name_only_update_leaves_the_login_alone() {
        let store = MemoryStore::default();
        let identity = MemoryIdentity::default();
        let dir = seed_directory(&store).await;
        identity.fail_updates();
        let service = AuthService::new(&store, &identity);

        let profile = service
            .update_profile(
                &dir.admin_user_id,
                ProfileUpdate { last_name: Some("Lovelace".to_string()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(profile.last_name.as_deref(), Some("Lovelace"));
    }
}
