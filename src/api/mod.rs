pub(crate) mod errors;
pub(crate) mod graphql;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod router;
