//! Tunable costs of the matching engine.
//!
//! A [`CostModel`] can be written as TOML; omitted keys keep their default:
//!
//! ```toml
//! ellipsis = 0.3
//! bool_sink = 500.0
//! ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataShapeError, DsResult};

/// Environment variable naming a TOML file to load the cost model from.
pub const ENV_COST_MODEL_PATH: &str = "DSHAPE_COST_MODEL";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Binding a measure type variable during signature matching.
    pub dtype_typevar: f64,
    /// Binding a plain dimension type variable.
    pub dim_typevar: f64,
    /// Capturing a run of dimensions with an ellipsis.
    pub ellipsis: f64,
    /// Broadcasting a `1` dimension, or matching fixed against var.
    pub broadcast: f64,
    /// First sighting of a type variable in [`coercion_cost`](crate::coercion::CoercionTable::coercion_cost).
    pub fresh_typevar: f64,
    /// Implicitly adding a leading `1` dimension.
    pub added_unit_dim: f64,
    /// Implicitly adding any other leading dimension.
    pub added_dim: f64,
    /// Coercing a number to `bool`.
    pub bool_sink: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            dtype_typevar: 0.125,
            dim_typevar: 0.125,
            ellipsis: 0.25,
            broadcast: 0.1,
            fresh_typevar: 0.1,
            added_unit_dim: 0.1,
            added_dim: 0.2,
            bool_sink: 1000.0,
        }
    }
}

impl CostModel {
    /// Load a cost model from a TOML file.
    pub fn load_from_toml(path: &Path) -> DsResult<Self> {
        let toml_str =
            std::fs::read_to_string(path).map_err(|e| DataShapeError::Io(e.to_string()))?;

        toml::from_str(&toml_str).map_err(|e| DataShapeError::ConfigParse {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save the cost model to a TOML file, creating parent directories as needed.
    pub fn save_to_toml(&self, path: &Path) -> DsResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| DataShapeError::ConfigParse {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DataShapeError::Io(e.to_string()))?;
        }
        std::fs::write(path, toml_str).map_err(|e| DataShapeError::Io(e.to_string()))
    }

    /// Load from the file named by `DSHAPE_COST_MODEL`, or use the defaults when unset.
    pub fn from_env() -> DsResult<Self> {
        match std::env::var(ENV_COST_MODEL_PATH) {
            Ok(path) => {
                log::info!("Loading cost model from `{}`", path);
                Self::load_from_toml(Path::new(&path))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// [`from_env`](Self::from_env), logging a failure and falling back to the defaults.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|err| {
            log::warn!("Falling back to the default cost model: {}", err);
            Self::default()
        })
    }
}
