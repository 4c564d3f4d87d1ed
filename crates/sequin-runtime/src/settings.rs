//! Runtime settings persisted as a JSON object.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::RuntimeError;

/// Settings key holding persistent global variables.
pub const PERSISTENT_VARIABLES_KEY: &str = "persistentVariables";

#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
  path: Option<PathBuf>,
  values: Map<String, Value>,
}

impl RuntimeSettings {
  /// Settings kept in memory only.
  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Load settings from `path`. A missing file gives empty settings.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
    let path = path.into();
    let values = match std::fs::read_to_string(&path) {
      Ok(text) => match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(values)) => values,
        Ok(_) => {
          return Err(RuntimeError::InvalidDocument {
            message: format!("settings file '{}' is not a JSON object", path.display()),
          });
        }
        Err(e) => {
          return Err(RuntimeError::InvalidDocument {
            message: format!("settings file '{}': {e}", path.display()),
          });
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
      Err(e) => return Err(io_error(&path, e)),
    };

    Ok(Self {
      path: Some(path),
      values,
    })
  }

  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: Value) {
    self.values.insert(key.into(), value);
  }

  /// Write the settings back to their file, if they have one.
  pub fn save(&self) -> Result<(), RuntimeError> {
    let Some(path) = &self.path else {
      return Ok(());
    };

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let text = serde_json::to_string_pretty(&self.values).map_err(|e| {
      RuntimeError::InvalidDocument {
        message: e.to_string(),
      }
    })?;
    std::fs::write(path, text).map_err(|e| io_error(path, e))
  }
}

pub(crate) fn io_error(path: &Path, e: std::io::Error) -> RuntimeError {
  RuntimeError::Io {
    path: path.display().to_string(),
    message: e.to_string(),
  }
}
