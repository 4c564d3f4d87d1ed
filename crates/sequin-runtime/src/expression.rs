//! Expressions used by component properties.
//!
//! Expressions are minijinja expressions evaluated to `serde_json::Value`s.
//! Identifiers are resolved by the caller (component inputs first, then
//! variables):
//!
//! ```text
//! count + 1
//! message == "ok" and not failed
//! settings.limits[2] * 0.5
//! "Error: " ~ message
//! ```
//!
//! An assignable expression is an identifier optionally followed by member
//! and index accessors (`total`, `point.x`, `items[i]`).

use std::collections::BTreeMap;

use minijinja::{Environment, ErrorKind};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
  #[error("invalid expression '{expression}': {message}")]
  Parse { expression: String, message: String },

  #[error("unknown identifier: {0}")]
  UnknownIdentifier(String),

  #[error("{0}")]
  Eval(String),

  #[error("result of '{0}' is not a finite number")]
  NotFinite(String),

  #[error("not an assignable expression: {0}")]
  NotAssignable(String),

  #[error("invalid assignment target: {0}")]
  InvalidTarget(String),
}

impl ExpressionError {
  /// Errors in how the expression was written, as opposed to errors caused
  /// by the values it was evaluated against.
  pub fn is_authoring_error(&self) -> bool {
    matches!(self, Self::Parse { .. } | Self::NotAssignable(_))
  }

  fn from_minijinja(source: &str, err: minijinja::Error) -> Self {
    match err.kind() {
      ErrorKind::SyntaxError
      | ErrorKind::UnknownFilter
      | ErrorKind::UnknownTest
      | ErrorKind::UnknownFunction
      | ErrorKind::UnknownMethod => Self::Parse {
        expression: source.to_string(),
        message: err.to_string(),
      },
      _ => Self::Eval(err.to_string()),
    }
  }
}

/// Supplies identifier values during evaluation.
pub trait Resolver {
  fn resolve(&self, name: &str) -> Option<Value>;
}

impl<F> Resolver for F
where
  F: Fn(&str) -> Option<Value>,
{
  fn resolve(&self, name: &str) -> Option<Value> {
    self(name)
  }
}

/// Compile and evaluate `source`.
///
/// Only the identifiers the expression mentions are resolved. Every one of
/// them must be known to `resolver`.
pub fn evaluate(source: &str, resolver: &dyn Resolver) -> Result<Value, ExpressionError> {
  let env = Environment::new();
  let expr = env
    .compile_expression(source)
    .map_err(|e| ExpressionError::from_minijinja(source, e))?;

  let mut names: Vec<String> = expr.undeclared_variables(false).into_iter().collect();
  names.sort();

  let mut context = BTreeMap::new();
  for name in names {
    let value = resolver
      .resolve(&name)
      .ok_or_else(|| ExpressionError::UnknownIdentifier(name.clone()))?;
    context.insert(name, value);
  }

  let result = expr
    .eval(&context)
    .map_err(|e| ExpressionError::from_minijinja(source, e))?;

  if f64::try_from(result.clone()).is_ok_and(|number| !number.is_finite()) {
    return Err(ExpressionError::NotFinite(source.to_string()));
  }

  serde_json::to_value(&result).map_err(|e| ExpressionError::Eval(e.to_string()))
}

/// Truthiness used for boolean inputs and conditions.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

/// Display form used by logs and messages.
pub fn value_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => "null".to_string(),
    other => other.to_string(),
  }
}

/// One step into a value when assigning. Index steps hold the source of
/// their index expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
  Field(String),
  Index(String),
}

/// A resolved step, after index expressions have been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum PathKey {
  Field(String),
  Index(usize),
}

/// Parsed left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignable {
  pub root: String,
  pub accessors: Vec<Accessor>,
}

impl Assignable {
  pub fn parse(source: &str) -> Result<Self, ExpressionError> {
    let not_assignable = || ExpressionError::NotAssignable(source.to_string());
    let text = source.trim();

    let (root, mut rest) = split_identifier(text).ok_or_else(not_assignable)?;
    let mut accessors = Vec::new();

    while !rest.is_empty() {
      if let Some(after_dot) = rest.strip_prefix('.') {
        let (field, tail) = split_identifier(after_dot).ok_or_else(not_assignable)?;
        accessors.push(Accessor::Field(field.to_string()));
        rest = tail;
      } else if rest.starts_with('[') {
        let close = matching_bracket(rest).ok_or_else(not_assignable)?;
        let index = rest[1..close].trim();
        if index.is_empty() {
          return Err(not_assignable());
        }
        accessors.push(Accessor::Index(index.to_string()));
        rest = &rest[close + 1..];
      } else {
        return Err(not_assignable());
      }
    }

    Ok(Self {
      root: root.to_string(),
      accessors,
    })
  }

  /// Evaluate index expressions into concrete keys.
  pub fn keys(&self, resolver: &dyn Resolver) -> Result<Vec<PathKey>, ExpressionError> {
    self
      .accessors
      .iter()
      .map(|accessor| match accessor {
        Accessor::Field(name) => Ok(PathKey::Field(name.clone())),
        Accessor::Index(source) => match evaluate(source, resolver)? {
          Value::String(name) => Ok(PathKey::Field(name)),
          Value::Number(n) => n
            .as_u64()
            .and_then(|index| usize::try_from(index).ok())
            .map(PathKey::Index)
            .ok_or_else(|| ExpressionError::InvalidTarget(format!("index {n}"))),
          other => Err(ExpressionError::InvalidTarget(format!(
            "index {}",
            type_name(&other)
          ))),
        },
      })
      .collect()
  }
}

fn split_identifier(text: &str) -> Option<(&str, &str)> {
  let mut chars = text.char_indices();
  let (_, first) = chars.next()?;
  if !(first.is_alphabetic() || first == '_') {
    return None;
  }
  let end = chars
    .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
    .map(|(i, _)| i)
    .unwrap_or(text.len());
  Some(text.split_at(end))
}

/// Byte offset of the `]` closing the `[` that starts `text`. Brackets
/// inside string literals are ignored.
fn matching_bracket(text: &str) -> Option<usize> {
  let mut depth = 0usize;
  let mut quote = None;
  let mut escaped = false;

  for (i, c) in text.char_indices() {
    if let Some(q) = quote {
      match c {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        _ if c == q => quote = None,
        _ => {}
      }
      continue;
    }
    match c {
      '"' | '\'' => quote = Some(c),
      '[' => depth += 1,
      ']' => {
        depth = depth.checked_sub(1)?;
        if depth == 0 {
          return Some(i);
        }
      }
      _ => {}
    }
  }
  None
}

/// Write `value` into `target` at `keys`, creating object fields as needed.
/// An index one past the end of an array appends.
pub fn write_path(target: &mut Value, keys: &[PathKey], value: Value) -> Result<(), ExpressionError> {
  let Some((last, parents)) = keys.split_last() else {
    *target = value;
    return Ok(());
  };

  let mut current = target;
  for key in parents {
    current = step_mut(current, key)?;
  }

  match (current, last) {
    (Value::Object(map), PathKey::Field(name)) => {
      map.insert(name.clone(), value);
      Ok(())
    }
    (Value::Array(items), PathKey::Index(index)) => {
      if *index < items.len() {
        items[*index] = value;
      } else if *index == items.len() {
        items.push(value);
      } else {
        return Err(ExpressionError::InvalidTarget(format!(
          "index {index} out of range"
        )));
      }
      Ok(())
    }
    (other, key) => Err(ExpressionError::InvalidTarget(format!(
      "{key:?} on {}",
      type_name(other)
    ))),
  }
}

fn step_mut<'a>(value: &'a mut Value, key: &PathKey) -> Result<&'a mut Value, ExpressionError> {
  match (value, key) {
    (Value::Object(map), PathKey::Field(name)) => map
      .get_mut(name)
      .ok_or_else(|| ExpressionError::InvalidTarget(format!("missing field '{name}'"))),
    (Value::Array(items), PathKey::Index(index)) => items
      .get_mut(*index)
      .ok_or_else(|| ExpressionError::InvalidTarget(format!("index {index} out of range"))),
    (other, key) => Err(ExpressionError::InvalidTarget(format!(
      "{key:?} on {}",
      type_name(other)
    ))),
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
