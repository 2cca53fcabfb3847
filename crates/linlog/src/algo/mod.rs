pub mod energy;
pub mod minimizer;
pub mod octree;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Exponents and gravitation of the energy model.
///
/// An exponent of `0` means the logarithm of the distance is used instead of a power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyModel {
    /// Exponent of the distance in the attraction term (1 for LinLog).
    pub attr_exponent: f64,
    /// Exponent of the distance in the repulsion term (0 for LinLog).
    pub repu_exponent: f64,
    /// Factor of the attraction towards the barycenter; 0 disables gravitation.
    pub gravitation_factor: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self::lin_log()
    }
}

impl EnergyModel {
    pub const DEFAULT_GRAVITATION: f64 = 0.001;

    pub fn lin_log() -> Self {
        Self {
            attr_exponent: 1.0,
            repu_exponent: 0.0,
            gravitation_factor: Self::DEFAULT_GRAVITATION,
        }
    }

    /// Energy version of the Fruchterman-Reingold model.
    pub fn fruchterman_reingold() -> Self {
        Self {
            attr_exponent: 3.0,
            repu_exponent: 0.0,
            gravitation_factor: Self::DEFAULT_GRAVITATION,
        }
    }

    pub fn with_gravitation(self, gravitation_factor: f64) -> Self {
        Self {
            gravitation_factor,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("attr_exponent", self.attr_exponent),
            ("repu_exponent", self.repu_exponent),
            ("gravitation_factor", self.gravitation_factor),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidModel { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerOptions {
    pub model: EnergyModel,
    /// Compute edge-length statistics before and after minimization.
    pub diagnostics: bool,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            model: EnergyModel::default(),
            diagnostics: true,
        }
    }
}

impl From<EnergyModel> for MinimizerOptions {
    fn from(model: EnergyModel) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }
}
