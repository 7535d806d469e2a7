//! File-backed model registry
//!
//! Layout: `<root>/<family>/v<version>/metadata.json` next to
//! `model.json`. Versions are immutable once written.

use crate::error::{ForecastError, Result};
use crate::models::{Model, Regressor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const METADATA_FILE: &str = "metadata.json";
const MODEL_FILE: &str = "model.json";

/// Metric key for mean absolute error
pub const MAE: &str = "mae";

/// Metric key for the coefficient of determination
pub const R2: &str = "r2";

/// Registry entry describing one trained model version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    /// Model family name
    pub name: String,
    /// Version within the family, starting at 1
    pub version: u32,
    /// Algorithm of the stored artifact
    pub algorithm: String,
    /// Evaluation metrics recorded at registration
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Registration time
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    dir: PathBuf,
}

impl RegisteredModel {
    /// Create an entry that is not backed by a registry directory
    pub fn detached(name: &str, version: u32, algorithm: &str, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.to_string(),
            version,
            algorithm: algorithm.to_string(),
            metrics,
            created_at: Utc::now(),
            dir: PathBuf::new(),
        }
    }

    /// Coefficient of determination, if recorded
    pub fn r2(&self) -> Option<f64> {
        self.metrics.get(R2).copied()
    }

    /// Mean absolute error, if recorded
    pub fn mae(&self) -> Option<f64> {
        self.metrics.get(MAE).copied()
    }

    /// Directory holding this version's files
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Client over a registry directory
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    root: PathBuf,
}

impl ModelRegistry {
    /// Open the registry rooted at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All versions of a model family, ascending by version
    pub fn list_models(&self, family: &str) -> Result<Vec<RegisteredModel>> {
        let family_dir = self.family_dir(family)?;
        if !family_dir.exists() {
            return Ok(Vec::new());
        }

        let mut models = Vec::new();
        for entry in fs::read_dir(&family_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(version) = file_name.to_str().and_then(parse_version_dir) else {
                continue;
            };

            let dir = entry.path();
            let raw = fs::read_to_string(dir.join(METADATA_FILE))?;
            let mut model: RegisteredModel = serde_json::from_str(&raw)?;
            if model.version != version {
                return Err(ForecastError::DataError(format!(
                    "{} declares version {} but lives in v{}",
                    dir.display(),
                    model.version,
                    version
                )));
            }
            model.dir = dir;
            models.push(model);
        }

        models.sort_by_key(|m| m.version);
        debug!(family, count = models.len(), "Listed registered models");
        Ok(models)
    }

    /// Load the artifact of a registered version
    pub fn load_model(&self, entry: &RegisteredModel) -> Result<Model> {
        let model = Model::from_json_file(entry.dir.join(MODEL_FILE))?;
        info!(
            family = %entry.name,
            version = entry.version,
            algorithm = model.name(),
            kind = model.kind(),
            "Loaded model artifact"
        );
        Ok(model)
    }

    /// Store a new version of `family` and return its entry
    pub fn register(
        &self,
        family: &str,
        metrics: BTreeMap<String, f64>,
        model: &Model,
    ) -> Result<RegisteredModel> {
        model.validate()?;

        let family_dir = self.family_dir(family)?;
        fs::create_dir_all(&family_dir)?;

        let version = self
            .list_models(family)?
            .last()
            .map_or(1, |latest| latest.version + 1);

        let mut entry = RegisteredModel::detached(family, version, model.name(), metrics);

        // Write into a staging directory and rename so readers never see half a version
        let staging = family_dir.join(format!(".staging-v{}", version));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir(&staging)?;
        fs::write(staging.join(MODEL_FILE), serde_json::to_string_pretty(model)?)?;
        fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_string_pretty(&entry)?,
        )?;

        let dir = family_dir.join(format!("v{}", version));
        fs::rename(&staging, &dir)?;
        entry.dir = dir;

        info!(family, version, algorithm = %entry.algorithm, "Registered model");
        Ok(entry)
    }

    fn family_dir(&self, family: &str) -> Result<PathBuf> {
        let valid = !family.is_empty()
            && !family.starts_with('.')
            && family
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            return Err(ForecastError::InvalidParameter(format!(
                "Invalid model family name '{}'",
                family
            )));
        }
        Ok(self.root.join(family))
    }
}

fn parse_version_dir(name: &str) -> Option<u32> {
    name.strip_prefix('v')?.parse().ok()
}
