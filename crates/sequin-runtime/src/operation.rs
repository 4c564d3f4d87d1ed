//! Asynchronous component work.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outstanding asynchronous work started by a component.
///
/// Owned by the component state that started it. `dispose` consumes the
/// operation, so teardown runs at most once; the runtime calls it when the
/// work reports completion, when the component runs again, or when the flow
/// state finishes.
pub trait AsyncOperation: Send {
  /// Cancel the work (if still running) and release its resources.
  fn dispose(self: Box<Self>);

  /// Whether the component may run again while this operation is
  /// outstanding. A reentrant operation is handed to the next execution
  /// instead of parking it.
  fn reentrant(&self) -> bool {
    false
  }
}

/// A tokio task with a cancellation token.
///
/// Disposing cancels the token and aborts the task.
#[derive(Debug)]
pub struct SpawnedOperation {
  cancel: CancellationToken,
  handle: JoinHandle<()>,
  reentrant: bool,
}

impl SpawnedOperation {
  /// Spawn `work` on the current tokio runtime. The token passed to the
  /// closure is cancelled on dispose.
  pub fn spawn<F, Fut>(work: F) -> Self
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(work(cancel.clone()));
    Self {
      cancel,
      handle,
      reentrant: false,
    }
  }

  /// Allow the component to run again while this task is alive.
  pub fn allow_reentry(mut self) -> Self {
    self.reentrant = true;
    self
  }

  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }

  pub fn cancellation_token(&self) -> &CancellationToken {
    &self.cancel
  }
}

impl AsyncOperation for SpawnedOperation {
  fn dispose(self: Box<Self>) {
    self.cancel.cancel();
    self.handle.abort();
  }

  fn reentrant(&self) -> bool {
    self.reentrant
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_dispose_cancels_the_task() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let operation = SpawnedOperation::spawn(|cancel| async move {
      cancel.cancelled().await;
      let _ = tx.send(());
    });
    let token = operation.cancellation_token().clone();

    Box::new(operation).dispose();
    assert!(token.is_cancelled());

    // Either the task observed cancellation or it was aborted first.
    let _ = tokio::time::timeout(Duration::from_millis(100), rx).await;
  }
}
