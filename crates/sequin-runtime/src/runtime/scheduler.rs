//! Task queue pump and debugger stepping.

use sequin_flow::{ComponentId, ConnectionLineId};
use tracing::{debug, info, instrument};

use super::Runtime;
use crate::flow_state::FlowStateId;
use crate::queue::QueueTask;
use crate::state::{RuntimeAction, RuntimeState, SingleStepMode, UiMode};

impl Runtime {
  pub(crate) fn push_task(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    connection_line: Option<ConnectionLineId>,
  ) {
    let task = self.queue.push(flow_state, component, connection_line);
    self.flow_states[flow_state.0].num_active_components += 1;
    debug!(
      task_id = task.id.0,
      component = %self.project.component_path(component),
      "task queued"
    );

    if self.is_paused() {
      self.show_next_queue_task();
    }
  }

  /// Drop every queued task of `flow_state`.
  pub(crate) fn remove_queue_tasks_for_flow_state(&mut self, flow_state: FlowStateId) {
    let removed = self.queue.remove_flow_state(flow_state);
    let state = &mut self.flow_states[flow_state.0];
    state.num_active_components = state.num_active_components.saturating_sub(removed);
    if removed > 0 {
      debug!(flow_state = %state.uid, removed, "queued tasks removed");
    }
  }

  /// Run one pass over the queue.
  ///
  /// Only the tasks queued when the pass starts are visited; tasks pushed
  /// while it runs wait for the next pass. Tasks whose component is busy
  /// are put back at the front in their original order. Returns `false`
  /// once the runtime is stopped.
  #[instrument(name = "pump", skip(self), fields(queued = self.queue.len()))]
  pub fn pump(&mut self) -> bool {
    self.active_connection_lines.clear();

    if (self.is_debugger_active && self.is_paused()) || self.queue.is_empty() {
      return !self.is_stopped();
    }

    let mut parked = Vec::new();
    let mut single_step = self.state == RuntimeState::SingleStep;
    let queue_len = self.queue.len();

    for _ in 0..queue_len {
      let Some(task) = self.queue.pop_front() else {
        break;
      };

      let busy = self.flow_states[task.flow_state.0]
        .component_state(task.component)
        .is_some_and(|state| state.is_busy());

      if busy {
        parked.push(task);
      } else {
        if self.is_debugger_active
          && !single_step
          && self.last_breakpoint_task != Some(task.id)
          && self
            .breakpoints
            .is_breakpoint_enabled_for_component(task.component)
        {
          info!(
            task_id = task.id.0,
            component = %self.project.component_path(task.component),
            "breakpoint hit"
          );
          self.last_breakpoint_task = Some(task.id);
          self.single_step_queue_task = Some(task);
          parked.push(task);
          single_step = true;
          break;
        }

        self.last_breakpoint_task = None;
        self.run(task.flow_state, task.component, task.connection_line);
      }

      if single_step || (self.is_debugger_active && self.is_paused()) || self.is_stopped() {
        break;
      }
    }

    self.queue.unshift(parked);

    if single_step && !self.is_stopped() {
      self.transition(RuntimeAction::Pause);
    }

    !self.is_stopped()
  }

  /// Apply pending messages and pump until the runtime is idle, paused,
  /// stopped, or `max_passes` passes have run. Returns the passes run.
  pub fn run_until_idle(&mut self, max_passes: usize) -> usize {
    let mut passes = 0;
    while passes < max_passes {
      self.process_messages();
      if self.is_idle() || self.is_stopped() || (self.is_debugger_active && self.is_paused()) {
        break;
      }
      self.pump();
      passes += 1;
    }
    passes
  }

  /// Surface the head of the queue to the debugger, auto-skipping it when
  /// the single-step mode says so.
  pub(crate) fn show_next_queue_task(&mut self) {
    let next = self.queue.front().copied();
    if let Some(next) = next {
      self.skip_next_queue_task(next);
    }
    self.select_queue_task(next);
  }

  /// Decide whether `next` should run without stopping, given the current
  /// single-step anchor and mode.
  ///
  /// - step over: skip tasks outside the anchor's flow state and its parent
  /// - step into: additionally stop in children of the anchor's flow state
  /// - step out: skip everything until the anchor's flow state finishes
  pub(crate) fn skip_next_queue_task(&mut self, next: QueueTask) {
    if !self.is_paused() {
      return;
    }
    let Some(anchor) = self.single_step_queue_task else {
      return;
    };
    if next.id == anchor.id || self.single_step_last_skipped_task == Some(next.id) {
      return;
    }

    let anchor_state = &self.flow_states[anchor.flow_state.0];
    if anchor_state.is_finished {
      self.single_step_queue_task = None;
      self.single_step_last_skipped_task = None;
      return;
    }

    let anchor_parent = anchor_state.parent;
    let next_parent = self.flow_states[next.flow_state.0].parent;
    let outside = next.flow_state != anchor.flow_state && Some(next.flow_state) != anchor_parent;

    let skip = match self.single_step_mode {
      SingleStepMode::StepOver => outside,
      SingleStepMode::StepInto => outside && next_parent != Some(anchor.flow_state),
      SingleStepMode::StepOut => true,
    };

    if skip {
      debug!(task_id = next.id.0, mode = ?self.single_step_mode, "stepping past task");
      self.single_step_last_skipped_task = Some(next.id);
      self.run_single_step(None);
    } else {
      self.single_step_queue_task = Some(next);
    }
  }

  /// Select a queue task in the debugger. While single-stepping only tasks
  /// of the anchor's flow state can be selected.
  pub fn select_queue_task(&mut self, task: Option<QueueTask>) {
    if let Some(anchor) = self.single_step_queue_task {
      if task.map(|task| task.flow_state) != Some(anchor.flow_state) {
        return;
      }
    }

    self.selected_queue_task = task.map(|task| task.id);
    if let Some(task) = task {
      self.selected_flow_state = Some(task.flow_state);
    }
  }

  /// Run the next task, then pause again.
  ///
  /// With a mode, the head of the queue becomes the single-step anchor.
  pub fn run_single_step(&mut self, mode: Option<SingleStepMode>) {
    if self.state != RuntimeState::Paused {
      self.transition(RuntimeAction::SingleStep);
      return;
    }
    if let Some(mode) = mode {
      self.single_step_mode = mode;
      self.single_step_queue_task = self.queue.front().copied();
      self.single_step_last_skipped_task = None;
    }
    self.transition(RuntimeAction::SingleStep);
  }

  pub fn pause(&mut self) {
    self.transition(RuntimeAction::Pause);
  }

  /// Leave the paused state and keep running.
  pub fn resume(&mut self) {
    self.single_step_queue_task = None;
    self.single_step_last_skipped_task = None;
    self.transition(RuntimeAction::Resume);
  }

  /// Turn the debugger off (and keep running) or on (and pause).
  pub fn toggle_debugger(&mut self) {
    if self.is_debugger_active {
      self.single_step_queue_task = None;
      self.single_step_last_skipped_task = None;
      self.transition(RuntimeAction::Run);
      if self.state == RuntimeState::Running {
        self.is_debugger_active = false;
        self.ui_mode = UiMode::Runtime;
      }
    } else {
      self.transition(RuntimeAction::Pause);
    }
  }
}
