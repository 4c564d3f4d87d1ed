use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Interval between pump passes when driven by `FlowRunner`.
  pub tick: Duration,
  /// Start paused with the debugger active.
  pub debugger: bool,
  /// JSON file holding runtime settings and persistent variables.
  pub settings_path: Option<PathBuf>,
  /// Stop the runtime once no work is queued or outstanding.
  pub stop_when_idle: bool,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      tick: Duration::from_millis(10),
      debugger: false,
      settings_path: None,
      stop_when_idle: false,
    }
  }
}
