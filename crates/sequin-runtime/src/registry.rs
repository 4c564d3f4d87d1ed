use std::collections::HashMap;
use std::sync::Arc;

use sequin_flow::{Component, ComponentKind, Project};

use crate::components;
use crate::context::ComponentExecutor;
use crate::error::RuntimeError;

/// Maps component types to executors.
///
/// Lookup goes by type name first, then by kind, so structural kinds
/// (`Start`, `CatchError`, widgets, ...) work whatever type name a project
/// uses for them.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
  by_type: HashMap<String, Arc<dyn ComponentExecutor>>,
  by_kind: HashMap<ComponentKind, Arc<dyn ComponentExecutor>>,
}

impl ComponentRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in component library.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    components::register_builtins(&mut registry);
    registry
  }

  pub fn register(
    &mut self,
    component_type: impl Into<String>,
    executor: impl ComponentExecutor + 'static,
  ) -> &mut Self {
    self
      .by_type
      .insert(component_type.into(), Arc::new(executor));
    self
  }

  pub fn register_kind(
    &mut self,
    kind: ComponentKind,
    executor: impl ComponentExecutor + 'static,
  ) -> &mut Self {
    self.by_kind.insert(kind, Arc::new(executor));
    self
  }

  pub fn executor_for(&self, component: &Component) -> Option<Arc<dyn ComponentExecutor>> {
    self
      .by_type
      .get(&component.component_type)
      .or_else(|| self.by_kind.get(&component.kind))
      .cloned()
  }

  /// Check every executable component of `project` has an executor.
  pub fn validate(&self, project: &Project) -> Result<(), RuntimeError> {
    for flow in project.flows() {
      for component in &flow.components {
        if !component.executable || component.kind == ComponentKind::Input {
          continue;
        }
        if self.executor_for(component).is_none() {
          return Err(RuntimeError::UnknownComponentType {
            component_type: component.component_type.clone(),
            component: project.component_path(component.id),
          });
        }
      }
    }
    Ok(())
  }
}

impl std::fmt::Debug for ComponentRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut types: Vec<_> = self.by_type.keys().collect();
    types.sort();
    f.debug_struct("ComponentRegistry")
      .field("types", &types)
      .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
      .finish()
  }
}
