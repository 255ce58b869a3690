use std::future::Future;
use std::time::Duration;

use crate::user::errors::UserError;

/// Run a collaborator call under a deadline.
///
/// Exceeding the deadline drops the call and is reported as
/// [`UserError::Timeout`], never as a hang.
pub async fn within<T, F>(deadline: Duration, operation: &'static str, call: F) -> Result<T, UserError>
where
    F: Future<Output = Result<T, UserError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation,
                deadline_ms = deadline.as_millis() as u64,
                "Operation exceeded its deadline"
            );
            Err(UserError::Timeout(operation.to_string()))
        }
    }
}
