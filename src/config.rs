use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchConfig;
use crate::pose_template::ToleranceConfig;

/// Configuración del daemon, cargada desde JSON. Los campos ausentes toman su valor por defecto.
///
/// ```json
/// {
///   "tolerance": { "finger_length_diff": 50, "position_diff": 60, "direction_diff": 0.55 },
///   "dispatch": { "rearm_ms": 500, "repeat_ms": 2000, "chain_timeout_ms": 4000 },
///   "script_dir": "./scripts",
///   "train_timeout_secs": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tolerance: ToleranceConfig,
    pub dispatch: DispatchConfig,
    /// Directorio donde viven los scripts que disparan los gestos
    pub script_dir: PathBuf,
    /// Espera máxima de una mano durante `train`
    pub train_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tolerance: ToleranceConfig::default(),
            dispatch: DispatchConfig::default(),
            script_dir: PathBuf::from("."),
            train_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer la configuración {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Configuración inválida en {:?}", path))
    }

    /// Sin ruta, configuración por defecto
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
