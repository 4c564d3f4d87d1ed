//! Async driver for a `Runtime`.
//!
//! The `FlowRunner` owns the runtime and its message receiver. It pumps the
//! task queue on a fixed tick and applies messages from component work and
//! control handles between passes.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::RuntimeError;
use crate::messages::{RuntimeHandle, RuntimeMessage};
use crate::runtime::Runtime;
use crate::state::RuntimeState;

/// Drives a runtime until it stops or is cancelled.
///
/// # Usage
///
/// ```ignore
/// let runner = FlowRunner::new(runtime)?;
/// let handle = runner.handle();
///
/// let cancel = CancellationToken::new();
/// let runtime = runner.run(cancel).await;
/// println!("{:?}", runtime.state());
/// ```
pub struct FlowRunner {
  runtime: Runtime,
  receiver: mpsc::UnboundedReceiver<RuntimeMessage>,
}

impl FlowRunner {
  /// Take ownership of `runtime`. Fails if its receiver was already taken.
  pub fn new(mut runtime: Runtime) -> Result<Self, RuntimeError> {
    let receiver = runtime
      .take_receiver()
      .ok_or(RuntimeError::ChannelClosed)?;
    Ok(Self { runtime, receiver })
  }

  /// A handle for pausing, stepping, stopping and widget actions.
  pub fn handle(&self) -> RuntimeHandle {
    self.runtime.handle()
  }

  pub fn runtime(&self) -> &Runtime {
    &self.runtime
  }

  pub fn runtime_mut(&mut self) -> &mut Runtime {
    &mut self.runtime
  }

  /// Run the loop. Starts the runtime first if it has not been started.
  ///
  /// Returns the runtime once it is stopped or `cancel` fires (which stops
  /// it too).
  #[instrument(name = "flow_runner", skip_all, fields(project = %self.runtime.project().name))]
  pub async fn run(mut self, cancel: CancellationToken) -> Runtime {
    let config = self.runtime.config().clone();
    if self.runtime.state() == RuntimeState::Starting {
      self.runtime.start_runtime(config.debugger);
    }

    let mut tick = tokio::time::interval(config.tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(tick_ms = config.tick.as_millis() as u64, "flow runner started");

    while !self.runtime.is_stopped() {
      tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          info!("flow runner cancelled");
          self.runtime.stop_runtime(None);
        }
        message = self.receiver.recv() => match message {
          Some(message) => self.runtime.apply_message(message),
          None => {
            debug!("runtime channel closed");
            break;
          }
        },
        _ = tick.tick() => {
          self.runtime.pump();
          if config.stop_when_idle && !self.runtime.is_stopped() && self.runtime.is_idle() {
            info!("runtime idle");
            self.runtime.stop_runtime(None);
          }
        }
      }
    }

    info!(
      state = ?self.runtime.state(),
      error = self.runtime.error().unwrap_or(""),
      "flow runner finished"
    );
    self.runtime
  }
}
