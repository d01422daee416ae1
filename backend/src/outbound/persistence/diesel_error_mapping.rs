//! Shared classification of pool and Diesel failures.
//!
//! Every adapter funnels driver errors through [`classify_diesel_error`] and
//! then picks its own port error constructor per [`StoreFailure`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// PostgreSQL reports deadlocks with SQLSTATE 40P01, which Diesel surfaces as
/// an unknown kind.
const DEADLOCK_MESSAGE: &str = "deadlock detected";

/// Coarse class of a failed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    /// The connection is gone.
    Connection(&'static str),
    /// Serialization failure or deadlock; the attempt may be retried.
    Transient(String),
    /// A unique constraint rejected the write.
    UniqueViolation(String),
    /// A foreign key rejected the write.
    ForeignKeyViolation(String),
    /// Anything else.
    Query(&'static str),
}

/// Extract the message carried by a pool error.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Classify a Diesel error, logging the driver detail at debug level.
pub(crate) fn classify_diesel_error(error: DieselError) -> StoreFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreFailure::Query("record not found"),
        DieselError::QueryBuilderError(_) => StoreFailure::Query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreFailure::Connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
            StoreFailure::Transient(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreFailure::UniqueViolation(constraint_label(info.as_ref()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            StoreFailure::ForeignKeyViolation(constraint_label(info.as_ref()))
        }
        DieselError::DatabaseError(_, info) if info.message().contains(DEADLOCK_MESSAGE) => {
            StoreFailure::Transient(info.message().to_owned())
        }
        DieselError::DatabaseError(_, _) => StoreFailure::Query("database error"),
        _ => StoreFailure::Query("database error"),
    }
}

fn constraint_label(info: &(dyn diesel::result::DatabaseErrorInformation + Send + Sync)) -> String {
    info.constraint_name()
        .map_or_else(|| info.message().to_owned(), ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;
    use rstest::rstest;

    #[derive(Debug)]
    struct FakeInfo {
        message: &'static str,
        constraint: Option<&'static str>,
    }

    impl DatabaseErrorInformation for FakeInfo {
        fn message(&self) -> &str {
            self.message
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(
        kind: DatabaseErrorKind,
        message: &'static str,
        constraint: Option<&'static str>,
    ) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(FakeInfo { message, constraint }))
    }

    #[rstest]
    fn serialization_failure_is_transient() {
        let err = database_error(
            DatabaseErrorKind::SerializationFailure,
            "could not serialize access due to concurrent update",
            None,
        );
        assert!(matches!(classify_diesel_error(err), StoreFailure::Transient(_)));
    }

    #[rstest]
    fn deadlock_is_transient() {
        let err = database_error(
            DatabaseErrorKind::Unknown,
            "deadlock detected",
            None,
        );
        assert_eq!(
            classify_diesel_error(err),
            StoreFailure::Transient("deadlock detected".to_owned())
        );
    }

    #[rstest]
    fn unique_violation_names_the_constraint() {
        let err = database_error(
            DatabaseErrorKind::UniqueViolation,
            "duplicate key value violates unique constraint",
            Some("reservations_active_slot_key"),
        );
        assert_eq!(
            classify_diesel_error(err),
            StoreFailure::UniqueViolation("reservations_active_slot_key".to_owned())
        );
    }

    #[rstest]
    fn foreign_key_violation_falls_back_to_message() {
        let err = database_error(
            DatabaseErrorKind::ForeignKeyViolation,
            "insert violates foreign key",
            None,
        );
        assert_eq!(
            classify_diesel_error(err),
            StoreFailure::ForeignKeyViolation("insert violates foreign key".to_owned())
        );
    }

    #[rstest]
    #[case(DieselError::NotFound, StoreFailure::Query("record not found"))]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection, "server closed the connection", None),
        StoreFailure::Connection("database connection error")
    )]
    #[case(
        database_error(DatabaseErrorKind::CheckViolation, "check failed", None),
        StoreFailure::Query("database error")
    )]
    fn other_failures_keep_their_class(#[case] error: DieselError, #[case] expected: StoreFailure) {
        assert_eq!(classify_diesel_error(error), expected);
    }

    #[rstest]
    fn pool_errors_expose_their_message() {
        assert_eq!(
            pool_error_message(PoolError::checkout("timed out")),
            "timed out"
        );
    }
}
