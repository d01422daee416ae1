//! Transaction-scoped notification job enqueueing.

use async_trait::async_trait;

use crate::domain::notifications::NotificationJob;

use super::define_port_error;

define_port_error! {
    /// Errors raised when enqueueing notification jobs.
    pub enum NotificationWriteError {
        /// The store connection failed.
        Connection { message: String } => "notification writer connection failed: {message}",
        /// The store reported a retryable conflict.
        Transient { message: String } => "notification writer transient conflict: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "notification writer query failed: {message}",
    }
}

/// Enqueues notification jobs inside a transaction attempt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationWriter: Send {
    /// Insert a queued job. It becomes visible to workers on commit.
    async fn create_job(&mut self, job: &NotificationJob) -> Result<(), NotificationWriteError>;
}
