use std::collections::HashMap;

use sequin_flow::ComponentId;

/// Answers whether the scheduler should stop before running a component.
pub trait Breakpoints: Send {
  fn is_breakpoint_enabled_for_component(&self, component: ComponentId) -> bool;
}

/// No breakpoints at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBreakpoints;

impl Breakpoints for NoBreakpoints {
  fn is_breakpoint_enabled_for_component(&self, _component: ComponentId) -> bool {
    false
  }
}

/// Breakpoints keyed by component, each enabled or disabled.
#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
  breakpoints: HashMap<ComponentId, bool>,
}

impl BreakpointSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an enabled breakpoint.
  pub fn add(&mut self, component: ComponentId) {
    self.breakpoints.insert(component, true);
  }

  pub fn remove(&mut self, component: ComponentId) {
    self.breakpoints.remove(&component);
  }

  pub fn set_enabled(&mut self, component: ComponentId, enabled: bool) {
    if let Some(entry) = self.breakpoints.get_mut(&component) {
      *entry = enabled;
    }
  }

  pub fn contains(&self, component: ComponentId) -> bool {
    self.breakpoints.contains_key(&component)
  }

  pub fn len(&self) -> usize {
    self.breakpoints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.breakpoints.is_empty()
  }
}

impl Breakpoints for BreakpointSet {
  fn is_breakpoint_enabled_for_component(&self, component: ComponentId) -> bool {
    self.breakpoints.get(&component).copied().unwrap_or(false)
  }
}
