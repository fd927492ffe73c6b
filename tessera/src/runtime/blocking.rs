use super::task::{self, JoinHandle};
use crate::sync::channel;

use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Runs a blocking closure on a dedicated OS thread.
///
/// The result comes back through the returned [`JoinHandle`]; a panic in
/// `f` surfaces as [`JoinError::Panicked`](crate::error::JoinError::Panicked).
/// Aborting the handle stops waiting for the result, not the thread.
///
/// # Panics
///
/// Panics if called outside of a runtime.
///
/// # Examples
///
/// ```rust
/// use tessera::task;
///
/// #[tessera::main]
/// async fn main() {
///     let sum = task::spawn_blocking(|| (1..=100u32).sum::<u32>()).await.unwrap();
///     assert_eq!(sum, 5050);
/// }
/// ```
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (sender, receiver) = channel();

    let spawned = thread::Builder::new()
        .name("tessera-blocking".to_owned())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(f));
            let _ = sender.send(result);
        });

    task::spawn(async move {
        if let Err(err) = spawned {
            panic!("failed to spawn blocking thread: {err}");
        }

        match receiver.recv().await {
            Some(Ok(value)) => value,
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => panic!("blocking thread exited without a result"),
        }
    })
}
