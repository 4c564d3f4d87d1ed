use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::context::{ComponentExecutor, Execution, ExecutionContext};
use crate::error::ComponentError;
use crate::operation::SpawnedOperation;

/// Waits `milliseconds` (input or property), then continues through
/// `@seqout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayComponent;

impl ComponentExecutor for DelayComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let milliseconds = match ctx.input("milliseconds") {
      Some(value) => value,
      None => ctx.eval_property("milliseconds")?.unwrap_or(Value::Null),
    };
    let duration = milliseconds
      .as_f64()
      .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
      .ok_or_else(|| ComponentError::InvalidProperty {
        name: "milliseconds".to_string(),
        message: format!("expected a non-negative duration, got {milliseconds}"),
      })?;

    if tokio::runtime::Handle::try_current().is_err() {
      return Err(ComponentError::failed("delay needs a tokio runtime"));
    }

    let handle = ctx.handle();
    let operation = SpawnedOperation::spawn(move |cancel| async move {
      tokio::select! {
        _ = cancel.cancelled() => {
          debug!("delay cancelled");
        }
        _ = tokio::time::sleep(duration) => {
          handle.propagate_value_through_seqout();
          handle.complete();
        }
      }
    });

    Ok(Execution::Deferred(Box::new(operation)))
  }
}
