pub(crate) mod admins;
pub(crate) mod assignments;
pub(crate) mod auth;
pub(crate) mod directory;
pub(crate) mod error;
pub(crate) mod identity;
pub(crate) mod import_export;
pub(crate) mod pagination;
pub(crate) mod questionnaires;
pub(crate) mod responses;
pub(crate) mod results;
pub(crate) mod saga;
