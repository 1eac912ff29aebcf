use async_graphql::{Error, ErrorExtensions};

use crate::schemas::BulkDeletePayload;
use crate::services::error::{ServiceError, ServiceResult};

pub(crate) type GqlResult<T> = async_graphql::Result<T>;

const TOO_MANY_LOGIN_ATTEMPTS: &str = "Too many login attempts. Please try again later.";

impl ServiceError {
    fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthenticated(_) => "UNAUTHENTICATED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InvalidState(_)
            | ServiceError::Validation(_)
            | ServiceError::Conflict(_) => "BAD_REQUEST",
            ServiceError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn reason(&self) -> Option<&'static str> {
        match self {
            ServiceError::InvalidState(_) => Some("INVALID_STATE"),
            ServiceError::Validation(_) => Some("VALIDATION"),
            ServiceError::Conflict(_) => Some("CONFLICT"),
            _ => None,
        }
    }
}

impl ErrorExtensions for ServiceError {
    fn extend(&self) -> Error {
        let code = self.code();
        let reason = self.reason();
        Error::new(self.to_string()).extend_with(|_, extensions| {
            extensions.set("code", code);
            if let Some(reason) = reason {
                extensions.set("reason", reason);
            }
        })
    }
}

/// Turns a service result into a transport result carrying the error `code`.
pub(crate) trait IntoGql<T> {
    fn gql(self) -> GqlResult<T>;
}

impl<T> IntoGql<T> for ServiceResult<T> {
    fn gql(self) -> GqlResult<T> {
        self.map_err(|err| err.extend())
    }
}

/// Splits a mutation outcome for a `{success, message, entity}` payload.
/// Expected failures become `Ok(Err(message))`; internal ones stay transport errors.
pub(crate) fn envelope<T>(result: ServiceResult<T>) -> GqlResult<Result<T, String>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(err) if err.is_internal() => Err(err.extend()),
        Err(err) => Ok(Err(err.to_string())),
    }
}

/// Builds a `{success, message, entity}` payload from a mutation outcome.
pub(crate) fn respond<T, P>(
    result: ServiceResult<T>,
    success_message: &str,
    build: impl FnOnce(bool, String, Option<T>) -> P,
) -> GqlResult<P> {
    Ok(match envelope(result)? {
        Ok(value) => build(true, success_message.to_string(), Some(value)),
        Err(message) => build(false, message, None),
    })
}

/// Payload for a bulk delete, e.g. "3 předmětů bylo úspěšně smazáno".
pub(crate) fn bulk_deleted(
    result: ServiceResult<u64>,
    noun: &str,
) -> GqlResult<BulkDeletePayload> {
    Ok(match envelope(result)? {
        Ok(count) => BulkDeletePayload {
            success: true,
            message: format!("{count} {noun} bylo úspěšně smazáno"),
            deleted_count: count as i64,
        },
        Err(message) => BulkDeletePayload { success: false, message, deleted_count: 0 },
    })
}

pub(crate) fn too_many_requests() -> Error {
    Error::new(TOO_MANY_LOGIN_ATTEMPTS).extend_with(|_, extensions| {
        extensions.set("code", "TOO_MANY_REQUESTS");
    })
}

#[cfg(test)]
mod tests {
    use async_graphql::{ErrorExtensions, Value};

    use super::{bulk_deleted, envelope, IntoGql};
    use crate::services::error::ServiceError;

    fn extension(err: &async_graphql::Error, key: &str) -> Option<Value> {
        err.extensions.as_ref().and_then(|extensions| extensions.get(key).cloned())
    }

    #[test]
    fn service_errors_carry_stable_codes() {
        let cases = [
            (ServiceError::not_authenticated(), "UNAUTHENTICATED", None),
            (ServiceError::Forbidden("no".into()), "FORBIDDEN", None),
            (ServiceError::NotFound("gone".into()), "NOT_FOUND", None),
            (ServiceError::InvalidState("closed".into()), "BAD_REQUEST", Some("INVALID_STATE")),
            (ServiceError::Validation("bad".into()), "BAD_REQUEST", Some("VALIDATION")),
            (ServiceError::Conflict("twice".into()), "BAD_REQUEST", Some("CONFLICT")),
            (ServiceError::Internal("boom".into()), "INTERNAL_SERVER_ERROR", None),
        ];

        for (err, code, reason) in cases {
            let extended = err.extend();
            assert_eq!(extended.message, err.to_string());
            assert_eq!(extension(&extended, "code"), Some(Value::from(code)));
            assert_eq!(extension(&extended, "reason"), reason.map(Value::from));
        }
    }

    #[test]
    fn envelope_keeps_internal_errors_on_the_transport() {
        let expected: Result<(), ServiceError> = Err(ServiceError::Conflict("exists".into()));
        assert_eq!(envelope(expected).unwrap(), Err("exists".to_string()));

        let internal: Result<(), ServiceError> = Err(ServiceError::Internal("db down".into()));
        let err = envelope(internal).unwrap_err();
        assert_eq!(extension(&err, "code"), Some(Value::from("INTERNAL_SERVER_ERROR")));

        let ok: Result<u8, ServiceError> = Ok(7);
        assert_eq!(ok.gql().unwrap(), 7);
    }

    #[test]
    fn bulk_delete_message_names_the_count() {
        let payload = bulk_deleted(Ok(3), "předmětů").unwrap();

        assert!(payload.success);
        assert_eq!(payload.message, "3 předmětů bylo úspěšně smazáno");
        assert_eq!(payload.deleted_count, 3);
    }
}
