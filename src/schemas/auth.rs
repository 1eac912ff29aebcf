use async_graphql::SimpleObject;

use crate::core::time::format_primitive;
use crate::db::models::Profile;
use crate::db::types::Role;
use crate::services::auth::AuthSession;

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "User")]
pub(crate) struct UserView {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) role: Role,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Profile> for UserView {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            role: profile.role,
            created_at: format_primitive(profile.created_at),
            updated_at: format_primitive(profile.updated_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
pub(crate) struct AuthPayload {
    pub(crate) user: UserView,
    pub(crate) token: String,
    pub(crate) refresh_token: String,
}

impl From<AuthSession> for AuthPayload {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
            refresh_token: session.refresh_token,
        }
    }
}

#[derive(Debug, SimpleObject)]
pub(crate) struct ProfilePayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) user: Option<UserView>,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct AdminList {
    pub(crate) admins: Vec<UserView>,
    pub(crate) total: i64,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct AdminPayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) admin: Option<UserView>,
}
