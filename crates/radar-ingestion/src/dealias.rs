//! Velocity dealiasing seam.
//!
//! Unfolding algorithms live outside this workspace. A [`Dealiaser`] either
//! hands back unfolded velocity under a new field name or says to use the
//! raw field.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use superob::{RadarVolume, SweepField};
use tracing::{debug, warn};

use crate::error::Result;

/// Unfolding algorithm requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealiasMethod {
    /// Region-based unfolding
    Region,
    /// Phase unwrapping
    Phase,
}

impl DealiasMethod {
    /// Parse a command-line tag. Anything other than `region` or `phase`
    /// means no unfolding.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "region" => Some(Self::Region),
            "phase" => Some(Self::Phase),
            other => {
                if other != "none" {
                    warn!(method = %s, "Unknown dealiasing method, using raw velocity");
                }
                None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Phase => "phase",
        }
    }
}

/// Result of a dealiasing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DealiasOutcome {
    /// Unfolded velocity, one field per sweep, to be stored as `field_name`.
    Unfolded {
        field_name: String,
        fields: Vec<SweepField>,
    },
    /// Grid the raw velocity field unchanged.
    UseRaw,
}

/// Unfolds radial velocity.
pub trait Dealiaser: Send + Sync {
    fn dealias(
        &self,
        volume: &RadarVolume,
        velocity_field: &str,
        method: DealiasMethod,
    ) -> Result<DealiasOutcome>;
}

/// Uses velocity already unfolded by the decoder, if the volume carries it.
#[derive(Debug, Clone)]
pub struct PrecomputedDealiaser {
    field_name: String,
}

impl Default for PrecomputedDealiaser {
    fn default() -> Self {
        Self::new("corrected_velocity")
    }
}

impl PrecomputedDealiaser {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
        }
    }
}

impl Dealiaser for PrecomputedDealiaser {
    fn dealias(
        &self,
        volume: &RadarVolume,
        velocity_field: &str,
        method: DealiasMethod,
    ) -> Result<DealiasOutcome> {
        if !volume.has_field(&self.field_name) {
            debug!(
                field = %self.field_name,
                method = method.as_str(),
                "No unfolded velocity in volume"
            );
            return Ok(DealiasOutcome::UseRaw);
        }

        // Sweeps without unfolded data keep their raw velocity
        let fields = volume
            .sweeps
            .iter()
            .map(|sweep| {
                sweep
                    .field(&self.field_name)
                    .or_else(|| sweep.field(velocity_field))
                    .cloned()
                    .unwrap_or_else(|| SweepField {
                        data: Array2::zeros((sweep.n_rays(), sweep.n_gates())),
                        mask: Array2::from_elem((sweep.n_rays(), sweep.n_gates()), true),
                    })
            })
            .collect();

        Ok(DealiasOutcome::Unfolded {
            field_name: self.field_name.clone(),
            fields,
        })
    }
}
