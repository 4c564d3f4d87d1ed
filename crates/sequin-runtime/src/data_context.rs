use std::collections::BTreeMap;

use sequin_flow::Variable;
use serde_json::Value;

/// Handle to one variable scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Scoped variable storage.
///
/// Scopes form a parent chain. Reads fall through to the parent when a scope
/// does not declare the name. Writes land in the nearest scope that declares
/// the name, or in the global scope when none does, so a flow's local
/// variables shadow outer ones without leaking out.
pub trait DataContext: Send {
  /// The process-wide scope holding global variables.
  fn global_scope(&self) -> ScopeId;

  /// Read a variable, falling back through parent scopes.
  fn get(&self, scope: ScopeId, name: &str) -> Option<Value>;

  /// Write a variable.
  fn set(&mut self, scope: ScopeId, name: &str, value: Value);

  /// Whether the scope itself declares `name`.
  fn declares(&self, scope: ScopeId, name: &str) -> bool;

  /// Create a child scope declaring `variables` with their default values.
  fn create_with_local_variables(&mut self, parent: ScopeId, variables: &[Variable]) -> ScopeId;

  /// Values declared directly in `scope`.
  fn scope_values(&self, scope: ScopeId) -> BTreeMap<String, Value>;

  /// Drop every scope and start again with an empty global scope.
  fn clear(&mut self);
}

#[derive(Debug, Default)]
struct Scope {
  parent: Option<ScopeId>,
  values: BTreeMap<String, Value>,
}

/// In-memory data context.
///
/// Scopes are kept for the lifetime of the context so finished flow states
/// remain inspectable.
#[derive(Debug)]
pub struct InMemoryDataContext {
  scopes: Vec<Scope>,
}

impl InMemoryDataContext {
  pub fn new() -> Self {
    Self {
      scopes: vec![Scope::default()],
    }
  }

  fn scope(&self, id: ScopeId) -> Option<&Scope> {
    self.scopes.get(id.0)
  }
}

impl Default for InMemoryDataContext {
  fn default() -> Self {
    Self::new()
  }
}

impl DataContext for InMemoryDataContext {
  fn global_scope(&self) -> ScopeId {
    ScopeId(0)
  }

  fn get(&self, scope: ScopeId, name: &str) -> Option<Value> {
    let mut current = Some(scope);
    while let Some(id) = current {
      let scope = self.scope(id)?;
      if let Some(value) = scope.values.get(name) {
        return Some(value.clone());
      }
      current = scope.parent;
    }
    None
  }

  fn set(&mut self, scope: ScopeId, name: &str, value: Value) {
    let mut current = Some(scope);
    while let Some(id) = current {
      let Some(scope) = self.scopes.get_mut(id.0) else {
        break;
      };
      if let Some(slot) = scope.values.get_mut(name) {
        *slot = value;
        return;
      }
      current = scope.parent;
    }

    self.scopes[0].values.insert(name.to_string(), value);
  }

  fn declares(&self, scope: ScopeId, name: &str) -> bool {
    self
      .scope(scope)
      .is_some_and(|scope| scope.values.contains_key(name))
  }

  fn create_with_local_variables(&mut self, parent: ScopeId, variables: &[Variable]) -> ScopeId {
    let values = variables
      .iter()
      .map(|variable| (variable.name.clone(), variable.default_value.clone()))
      .collect();
    self.scopes.push(Scope {
      parent: Some(parent),
      values,
    });
    ScopeId(self.scopes.len() - 1)
  }

  fn scope_values(&self, scope: ScopeId) -> BTreeMap<String, Value> {
    self
      .scope(scope)
      .map(|scope| scope.values.clone())
      .unwrap_or_default()
  }

  fn clear(&mut self) {
    self.scopes.clear();
    self.scopes.push(Scope::default());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn variable(name: &str, default_value: Value) -> Variable {
    Variable {
      name: name.to_string(),
      default_value,
      persistent: false,
    }
  }

  #[test]
  fn test_child_shadows_parent() {
    let mut context = InMemoryDataContext::new();
    let global = context.global_scope();
    context.set(global, "count", json!(1));
    context.set(global, "name", json!("global"));

    let child = context.create_with_local_variables(global, &[variable("name", json!("local"))]);

    assert_eq!(context.get(child, "count"), Some(json!(1)));
    assert_eq!(context.get(child, "name"), Some(json!("local")));
    assert_eq!(context.get(global, "name"), Some(json!("global")));

    context.set(child, "name", json!("changed"));
    assert_eq!(context.get(child, "name"), Some(json!("changed")));
    assert_eq!(context.get(global, "name"), Some(json!("global")));
  }

  #[test]
  fn test_undeclared_writes_go_global() {
    let mut context = InMemoryDataContext::new();
    let global = context.global_scope();
    let child = context.create_with_local_variables(global, &[]);
    let grandchild = context.create_with_local_variables(child, &[variable("x", json!(0))]);

    context.set(grandchild, "count", json!(3));
    assert_eq!(context.get(global, "count"), Some(json!(3)));
    assert!(context.declares(global, "count"));
    assert!(!context.declares(child, "count"));

    context.set(grandchild, "x", json!(9));
    assert_eq!(context.scope_values(grandchild).get("x"), Some(&json!(9)));
    assert_eq!(context.get(child, "x"), None);
  }

  #[test]
  fn test_clear_resets_globals() {
    let mut context = InMemoryDataContext::new();
    let global = context.global_scope();
    context.set(global, "count", json!(1));
    context.clear();
    assert_eq!(context.get(context.global_scope(), "count"), None);
  }
}
