use std::collections::VecDeque;

use sequin_flow::{ComponentId, ConnectionLineId};
use serde::{Deserialize, Serialize};

use crate::flow_state::FlowStateId;

/// Sequence number of a queue task. Used for diagnostics and debug-info, not
/// for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueTaskId(pub u64);

/// A scheduled run of one component in one flow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTask {
  pub id: QueueTaskId,
  pub flow_state: FlowStateId,
  pub component: ComponentId,
  /// The line whose delivery made the component ready, if any.
  pub connection_line: Option<ConnectionLineId>,
}

/// FIFO task queue.
#[derive(Debug, Default)]
pub struct TaskQueue {
  tasks: VecDeque<QueueTask>,
  last_id: u64,
}

impl TaskQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a task and return it.
  pub fn push(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    connection_line: Option<ConnectionLineId>,
  ) -> QueueTask {
    self.last_id += 1;
    let task = QueueTask {
      id: QueueTaskId(self.last_id),
      flow_state,
      component,
      connection_line,
    };
    self.tasks.push_back(task);
    task
  }

  /// Append an existing task, keeping its id.
  pub fn push_existing(&mut self, task: QueueTask) {
    self.last_id = self.last_id.max(task.id.0);
    self.tasks.push_back(task);
  }

  pub fn pop_front(&mut self) -> Option<QueueTask> {
    self.tasks.pop_front()
  }

  /// Put tasks back at the front, keeping their relative order.
  pub fn unshift(&mut self, tasks: Vec<QueueTask>) {
    for task in tasks.into_iter().rev() {
      self.tasks.push_front(task);
    }
  }

  pub fn front(&self) -> Option<&QueueTask> {
    self.tasks.front()
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &QueueTask> {
    self.tasks.iter()
  }

  /// Remove every task of `flow_state`. Returns how many were removed.
  pub fn remove_flow_state(&mut self, flow_state: FlowStateId) -> usize {
    let before = self.tasks.len();
    self.tasks.retain(|task| task.flow_state != flow_state);
    before - self.tasks.len()
  }

  pub fn last_id(&self) -> u64 {
    self.last_id
  }

  /// Make the next pushed task get an id above `last_id`.
  pub fn reserve_ids(&mut self, last_id: u64) {
    self.last_id = self.last_id.max(last_id);
  }

  pub fn clear(&mut self) {
    self.tasks.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sequin_flow::FlowId;

  fn component(index: usize) -> ComponentId {
    ComponentId {
      flow: FlowId(0),
      index,
    }
  }

  #[test]
  fn test_fifo_and_unshift_order() {
    let mut queue = TaskQueue::new();
    let a = queue.push(FlowStateId(0), component(0), None);
    let b = queue.push(FlowStateId(0), component(1), None);
    let c = queue.push(FlowStateId(1), component(2), None);
    assert!(a.id < b.id && b.id < c.id);

    let first = queue.pop_front().unwrap();
    let second = queue.pop_front().unwrap();
    assert_eq!(first, a);
    queue.unshift(vec![first, second]);

    let order: Vec<_> = queue.iter().map(|task| task.id).collect();
    assert_eq!(order, vec![a.id, b.id, c.id]);
  }

  #[test]
  fn test_remove_flow_state() {
    let mut queue = TaskQueue::new();
    queue.push(FlowStateId(0), component(0), None);
    queue.push(FlowStateId(1), component(1), None);
    queue.push(FlowStateId(0), component(2), None);

    assert_eq!(queue.remove_flow_state(FlowStateId(0)), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.front().unwrap().flow_state, FlowStateId(1));
  }
}
