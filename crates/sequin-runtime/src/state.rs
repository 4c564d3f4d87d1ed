//! Runtime state machine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeState {
  Starting,
  StartingWithoutDebugger,
  StartingWithDebugger,
  Running,
  Paused,
  Resumed,
  SingleStep,
  Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeAction {
  StartWithoutDebugger,
  StartWithDebugger,
  Run,
  Resume,
  Pause,
  SingleStep,
  Stop,
}

/// What a transition does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Enter a new state.
  Enter(RuntimeState),
  /// Stay stopped but turn on debugger inspection.
  InspectStopped,
  /// The pair is not in the table.
  Invalid,
}

impl RuntimeState {
  /// Look up the transition for `action` in this state.
  ///
  /// `Stop` is checked after the state-specific table so it wins from every
  /// state except `Stopped` itself.
  pub fn transition(self, action: RuntimeAction) -> Transition {
    use RuntimeAction as A;
    use RuntimeState as S;

    let next = match (self, action) {
      (S::Starting, A::StartWithoutDebugger) => Some(S::StartingWithoutDebugger),
      (S::Starting, A::StartWithDebugger) => Some(S::StartingWithDebugger),
      (S::StartingWithoutDebugger, A::Run | A::Resume) => Some(S::Running),
      (S::StartingWithDebugger, A::Pause) => Some(S::Paused),
      (S::Running, A::Pause) => Some(S::Paused),
      (S::Paused, A::Run) => Some(S::Running),
      (S::Paused, A::Resume) => Some(S::Resumed),
      (S::Paused, A::SingleStep) => Some(S::SingleStep),
      (S::Resumed, A::Run) => Some(S::Running),
      (S::Resumed, A::Pause) => Some(S::Paused),
      (S::SingleStep, A::Pause) => Some(S::Paused),
      (S::Stopped, A::Pause) => return Transition::InspectStopped,
      _ => None,
    };

    if let Some(next) = next {
      return Transition::Enter(next);
    }

    if action == A::Stop && self != S::Stopped {
      return Transition::Enter(S::Stopped);
    }

    Transition::Invalid
  }
}

/// How single-stepping decides which tasks to run without stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleStepMode {
  #[default]
  StepInto,
  StepOver,
  StepOut,
}

/// Which view the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
  #[default]
  Runtime,
  Debugger,
  Editor,
}
