//! Model selection by R² acceptance band

use crate::config::AcceptanceBand;
use crate::error::{ForecastError, Result};
use crate::registry::RegisteredModel;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One candidate as shown in the model comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    /// Algorithm name
    pub name: String,
    /// Registry version
    pub version: u32,
    /// Mean absolute error, if recorded
    pub mae: Option<f64>,
    /// Coefficient of determination, if recorded
    pub r2: Option<f64>,
    /// Whether the score lies in the acceptance band
    pub in_band: bool,
    /// Whether this candidate was chosen
    pub selected: bool,
}

/// Outcome of model selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// The chosen model
    pub model: RegisteredModel,
    /// True when no candidate was in the band and the global best was used
    pub degraded: bool,
    /// Every candidate, in registry order
    pub candidates: Vec<CandidateSummary>,
}

/// Picks the registered model to use for inference
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSelector {
    band: AcceptanceBand,
}

impl ModelSelector {
    /// Create a selector for an acceptance band
    pub fn new(band: AcceptanceBand) -> Self {
        Self { band }
    }

    /// The band in use
    pub fn band(&self) -> AcceptanceBand {
        self.band
    }

    /// Select the best in-band model, falling back to the global best.
    ///
    /// A missing R² scores as zero. Ties keep the first candidate in
    /// iteration order.
    pub fn select(&self, family: &str, candidates: &[RegisteredModel]) -> Result<Selection> {
        if candidates.is_empty() {
            return Err(ForecastError::EmptyCandidates(family.to_string()));
        }

        let in_band = best_by_r2(candidates.iter().filter(|m| self.band.contains(score(m))));
        let (chosen, degraded) = match in_band {
            Some(model) => {
                info!(
                    family,
                    version = model.version,
                    r2 = score(model),
                    band = %self.band,
                    "Selected model within acceptance band"
                );
                (model, false)
            }
            None => {
                // Non-empty candidates always yield a global best
                let fallback = best_by_r2(candidates.iter())
                    .ok_or_else(|| ForecastError::EmptyCandidates(family.to_string()))?;
                warn!(
                    family,
                    version = fallback.version,
                    r2 = score(fallback),
                    band = %self.band,
                    "No model within acceptance band, using global best"
                );
                (fallback, true)
            }
        };

        let summaries = candidates
            .iter()
            .map(|m| CandidateSummary {
                name: m.algorithm.clone(),
                version: m.version,
                mae: m.mae(),
                r2: m.r2(),
                in_band: self.band.contains(score(m)),
                selected: std::ptr::eq(m, chosen),
            })
            .collect();

        Ok(Selection {
            model: chosen.clone(),
            degraded,
            candidates: summaries,
        })
    }
}

fn score(model: &RegisteredModel) -> f64 {
    model.r2().filter(|r2| r2.is_finite()).unwrap_or(0.0)
}

fn best_by_r2<'a>(models: impl Iterator<Item = &'a RegisteredModel>) -> Option<&'a RegisteredModel> {
    models.fold(None, |best, model| match best {
        Some(current) if score(model) <= score(current) => Some(current),
        _ => Some(model),
    })
}
