//! Waiting for the switch to stop

use std::future::Future;
use std::io;

use tracing::{info, warn};

/// Wait for `signal` or for `task` to finish, whichever comes first
///
/// Returns the task's output when it ended on its own. If the signal cannot
/// be listened for, the error is logged and the task is awaited instead.
pub async fn until_shutdown<S, T>(signal: S, task: &mut T) -> Option<T::Output>
where
    S: Future<Output = io::Result<()>>,
    T: Future + Unpin,
{
    tokio::select! {
        result = signal => match result {
            Ok(()) => {
                info!("Shutting down");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                Some((&mut *task).await)
            }
        },
        output = &mut *task => Some(output),
    }
}
