//! Runtime log items and sinks.
//!
//! Every scheduling, execution and error event is appended to the runtime's
//! log history, mirrored to `tracing`, and handed to a `LogSink` so hosts can
//! stream it to a debugger view.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Severity of a log item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogItemType {
  Fatal,
  Error,
  Warning,
  Scpi,
  Info,
  Debug,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogKind {
  /// A component was run.
  Execute,
  /// A value travelled along a connection line.
  OutputValue {
    output: String,
    value: serde_json::Value,
  },
  /// A component failed.
  ExecutionError,
  ActionStart,
  ActionEnd,
  ExecuteWidgetAction,
  /// A widget was triggered but has neither an action output nor an action.
  WidgetActionNotDefined,
  /// A widget names an action that does not exist.
  WidgetActionNotFound { action: String },
  /// A called action has no Start component.
  NoStartActionComponent,
  /// Written by a component body.
  User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogItem {
  pub id: u64,
  /// Milliseconds since the runtime was created.
  pub time_ms: u64,
  #[serde(rename = "type")]
  pub item_type: LogItemType,
  #[serde(flatten)]
  pub kind: LogKind,
  pub message: String,
  /// Uid of the owning flow state.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub flow_state: Option<String>,
  /// Component path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub component: Option<String>,
  /// Connection line path.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub connection_line: Option<String>,
}

impl LogItem {
  pub fn new(item_type: LogItemType, kind: LogKind, message: impl Into<String>) -> Self {
    Self {
      id: 0,
      time_ms: 0,
      item_type,
      kind,
      message: message.into(),
      flow_state: None,
      component: None,
      connection_line: None,
    }
  }

  pub fn with_flow_state(mut self, uid: impl Into<String>) -> Self {
    self.flow_state = Some(uid.into());
    self
  }

  pub fn with_component(mut self, path: impl Into<String>) -> Self {
    self.component = Some(path.into());
    self
  }

  pub fn with_connection_line(mut self, path: impl Into<String>) -> Self {
    self.connection_line = Some(path.into());
    self
  }
}

/// Receives log items as they are appended.
///
/// Implementations decide what to do with them (stream to a UI, persist,
/// ignore). Called synchronously from the runtime, so it must not block.
pub trait LogSink: Send + Sync {
  fn notify(&self, item: LogItem);
}

/// Discards all items.
#[derive(Debug, Clone, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
  fn notify(&self, _item: LogItem) {}
}

/// Sends items to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelLogSink {
  sender: mpsc::UnboundedSender<LogItem>,
}

impl ChannelLogSink {
  pub fn new(sender: mpsc::UnboundedSender<LogItem>) -> Self {
    Self { sender }
  }
}

impl LogSink for ChannelLogSink {
  fn notify(&self, item: LogItem) {
    // Receiver may have been dropped
    let _ = self.sender.send(item);
  }
}

/// Append-only log history.
pub struct RuntimeLogs {
  items: Vec<LogItem>,
  next_id: u64,
  started_at: Instant,
  sink: Arc<dyn LogSink>,
}

impl RuntimeLogs {
  pub fn new(sink: Arc<dyn LogSink>) -> Self {
    Self {
      items: Vec::new(),
      next_id: 1,
      started_at: Instant::now(),
      sink,
    }
  }

  pub fn set_sink(&mut self, sink: Arc<dyn LogSink>) {
    self.sink = sink;
  }

  pub fn items(&self) -> &[LogItem] {
    &self.items
  }

  pub fn add(&mut self, mut item: LogItem) {
    item.id = self.next_id;
    self.next_id += 1;
    item.time_ms = self.started_at.elapsed().as_millis() as u64;

    trace_item(&item);
    self.sink.notify(item.clone());
    self.items.push(item);
  }

  /// Replace the history, e.g. when restoring a debug-info snapshot.
  pub fn restore(&mut self, items: Vec<LogItem>) {
    self.next_id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
    self.items = items;
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }
}

fn trace_item(item: &LogItem) {
  let flow_state = item.flow_state.as_deref().unwrap_or("-");
  let component = item.component.as_deref().unwrap_or("-");

  match item.item_type {
    LogItemType::Fatal | LogItemType::Error => {
      error!(log_id = item.id, flow_state, component, kind = ?item.kind, message = %item.message, "runtime log");
    }
    LogItemType::Warning => {
      warn!(log_id = item.id, flow_state, component, kind = ?item.kind, message = %item.message, "runtime log");
    }
    LogItemType::Info | LogItemType::Scpi => {
      info!(log_id = item.id, flow_state, component, kind = ?item.kind, message = %item.message, "runtime log");
    }
    LogItemType::Debug => {
      debug!(log_id = item.id, flow_state, component, kind = ?item.kind, message = %item.message, "runtime log");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ids_are_monotonic_and_sink_sees_items() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut logs = RuntimeLogs::new(Arc::new(ChannelLogSink::new(tx)));

    logs.add(LogItem::new(LogItemType::Debug, LogKind::Execute, "a"));
    logs.add(LogItem::new(LogItemType::Error, LogKind::ExecutionError, "b").with_flow_state("f"));

    assert_eq!(logs.items().len(), 2);
    assert_eq!(logs.items()[0].id, 1);
    assert_eq!(logs.items()[1].id, 2);

    assert_eq!(rx.try_recv().unwrap().message, "a");
    let second = rx.try_recv().unwrap();
    assert_eq!(second.flow_state.as_deref(), Some("f"));
  }

  #[test]
  fn test_restore_continues_numbering() {
    let mut logs = RuntimeLogs::new(Arc::new(NoopLogSink));
    let mut item = LogItem::new(LogItemType::Info, LogKind::User, "old");
    item.id = 41;
    logs.restore(vec![item]);

    logs.add(LogItem::new(LogItemType::Info, LogKind::User, "new"));
    assert_eq!(logs.items()[1].id, 42);
  }

  #[test]
  fn test_serialized_shape() {
    let item = LogItem::new(
      LogItemType::Debug,
      LogKind::OutputValue {
        output: "result".to_string(),
        value: serde_json::json!(12),
      },
      "",
    );
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["type"], "debug");
    assert_eq!(json["kind"], "output_value");
    assert_eq!(json["output"], "result");

    let back: LogItem = serde_json::from_value(json).unwrap();
    assert_eq!(back, item);
  }
}
