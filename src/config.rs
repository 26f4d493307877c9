//! Configuración del pipeline en JSON.
//!
//! ```json
//! {
//!   "templates_file": "templates.txt",
//!   "movements_map": "1:GOFORWARD,2:GOBACKWARD,3:NOTHING",
//!   "k": 3,
//!   "window_size": 150,
//!   "step": 15,
//!   "median_window": 10,
//!   "distance": "all_axis_dtw",
//!   "policy": { "strategy": "historical", "history_size": 2 }
//! }
//! ```
//!
//! `templates_file` relativo se resuelve respecto al fichero de configuración.

use crate::classifier::KnnClassifier;
use crate::decision::{DecisionPolicy, GestureDecisionEngine};
use crate::distance::{DistanceKind, DistanceMetric};
use crate::label_map::{LabelMap, MovementsMap};
use crate::pipeline::GesturePipeline;
use crate::templates::TemplateLibrary;
use crate::types::{DEFAULT_KNN_K, DEFAULT_MEDIAN_WINDOW, DEFAULT_STEP, DEFAULT_WINDOW_SIZE};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No se pudo leer la configuración: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuración JSON inválida: {0}")]
    Json(#[from] serde_json::Error),

    #[error("k debe ser > 0")]
    ZeroK,

    #[error("window_size debe ser > 0")]
    ZeroWindow,

    #[error("step debe ser > 0")]
    ZeroStep,

    #[error("step ({step}) no puede superar window_size ({window_size})")]
    StepTooLarge { window_size: usize, step: usize },

    #[error("median_window debe ser > 0 (usa null para desactivar el filtro)")]
    ZeroMedianWindow,

    #[error("policy.history_size debe ser > 0")]
    ZeroHistory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    pub templates_file: PathBuf,
    pub movements_map: MovementsMap,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_step")]
    pub step: usize,
    /// `None` desactiva el filtro de mediana
    #[serde(default = "default_median_window")]
    pub median_window: Option<usize>,
    #[serde(default)]
    pub distance: DistanceKind,
    #[serde(default)]
    pub policy: DecisionPolicy,
}

fn default_k() -> usize {
    DEFAULT_KNN_K
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_step() -> usize {
    DEFAULT_STEP
}

fn default_median_window() -> Option<usize> {
    Some(DEFAULT_MEDIAN_WINDOW)
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lee y valida; `templates_file` queda resuelto respecto al directorio
    /// del fichero de configuración.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;
        if config.templates_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.templates_file = dir.join(&config.templates_file);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroK);
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.step > self.window_size {
            return Err(ConfigError::StepTooLarge {
                window_size: self.window_size,
                step: self.step,
            });
        }
        if self.median_window == Some(0) {
            return Err(ConfigError::ZeroMedianWindow);
        }
        if self.policy.history_size() == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(())
    }

    pub fn metric(&self) -> DistanceMetric {
        DistanceMetric::new(self.distance, self.median_window)
    }

    pub fn label_map(&self) -> Result<LabelMap> {
        LabelMap::from_movements(&self.movements_map).context("movements_map inválido")
    }

    pub fn load_library(&self) -> Result<TemplateLibrary> {
        let label_map = self.label_map()?;
        TemplateLibrary::load(&self.templates_file, &label_map).with_context(|| {
            format!(
                "No se pudo cargar la biblioteca de plantillas {:?}",
                self.templates_file
            )
        })
    }

    /// Construye un pipeline sobre una biblioteca ya cargada. Varios
    /// pipelines (p. ej. con otro `window_size`) pueden compartirla.
    pub fn build(&self, library: Arc<TemplateLibrary>) -> Result<GesturePipeline> {
        let classifier = KnnClassifier::new(library, self.k, self.metric(), self.window_size)
            .context("Clasificador inválido")?;
        let engine = GestureDecisionEngine::new(self.policy.clone())
            .context("Política de decisión inválida")?;
        let pipeline =
            GesturePipeline::new(classifier, engine, self.step).context("Ventana inválida")?;
        Ok(pipeline)
    }
}

/// Configuración + plantillas -> pipeline listo para `feed`
pub fn load_pipeline(config_path: impl AsRef<Path>) -> Result<(PipelineConfig, GesturePipeline)> {
    let config_path = config_path.as_ref();
    let config = PipelineConfig::load(config_path)
        .with_context(|| format!("Configuración {:?}", config_path))?;
    let library = Arc::new(config.load_library()?);
    let pipeline = config.build(library)?;
    Ok((config, pipeline))
}
