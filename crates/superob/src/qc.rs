//! Quality-control masking of gridded fields.
//!
//! Masks only grow. Reflectivity masking is recomputed from the kernel
//! output stored in the field and OR-combined with the existing mask, so
//! applying it again changes nothing. Cells the kernel rejected stay masked.

use ndarray::{Array2, Array3, Zip};
use radar_common::MISSING;
use tracing::{debug, info};

use crate::config::{AnalysisGridSpec, HaloPolicy, QcConfig};
use crate::error::{Result, SuperobError};
use crate::field::{GriddedField, ZeroEchoLayer};
use crate::morphology::maximum_filter;

/// Dilated reflectivity above this marks the neighbourhood of echo.
pub const HALO_THRESHOLD: f32 = 0.1;

/// Mask stage applied between gridding and serialization.
#[derive(Debug, Clone)]
pub struct QcMaskStage {
    config: QcConfig,
    height_ceiling: f64,
}

impl QcMaskStage {
    pub fn new(config: QcConfig, height_ceiling: f64) -> Self {
        Self {
            config,
            height_ceiling,
        }
    }

    /// Take the height ceiling from the grid spec.
    pub fn from_spec(config: QcConfig, spec: &AnalysisGridSpec) -> Self {
        Self::new(config, spec.height_ceiling)
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    /// Mask reflectivity and, if enabled, build the zero-echo layer.
    ///
    /// Echo is any accepted cell at or above `min_dbz_analysis`. With zero-echo
    /// synthesis the 3-D field keeps only echo, and a single layer of zero
    /// reflectivity covers columns that had accepted data but no echo within
    /// the halo. Without synthesis, weak cells away from echo become zero
    /// reflectivity in place, and weak cells inside the halo follow the
    /// configured [`HaloPolicy`]. Zero cells are thinned to every
    /// `thin_factor`-th row and column.
    pub fn mask_reflectivity(&self, field: &mut GriddedField, thin_factor: usize) {
        let (nz, ny, nx) = field.shape();
        let before = field.valid_count();
        let min_dbz = self.config.min_dbz_analysis;
        let footprint = self.config.halo_footprint;

        let mut mask = Array3::from_elem((nz, ny, nx), true);
        let mut data = Array3::from_elem((nz, ny, nx), MISSING);

        if self.config.zero_echo.enabled {
            let mut composite = Array2::<f32>::zeros((ny, nx));
            let mut any_accepted = Array2::from_elem((ny, nx), false);

            for ((k, j, i), &ok) in field.accepted.indexed_iter() {
                if !ok {
                    continue;
                }
                any_accepted[[j, i]] = true;
                let v = field.analysis[[k, j, i]];
                if v >= min_dbz {
                    composite[[j, i]] = composite[[j, i]].max(v);
                    mask[[k, j, i]] = false;
                    data[[k, j, i]] = v;
                }
            }

            let halo = maximum_filter(&composite, footprint);
            let layer_height = self.config.zero_echo.layer_height as f32;
            let above_ceiling = self.height_ceiling > 0.0 && f64::from(layer_height) > self.height_ceiling;

            let mut layer_mask = Array2::from_elem((ny, nx), true);
            let mut layer_data = Array2::from_elem((ny, nx), MISSING);
            for j in 0..ny {
                for i in 0..nx {
                    let candidate = any_accepted[[j, i]] && halo[[j, i]] <= HALO_THRESHOLD;
                    if candidate && on_stride(j, i, thin_factor) && !above_ceiling {
                        layer_mask[[j, i]] = false;
                        layer_data[[j, i]] = 0.0;
                    }
                }
            }

            let layer = ZeroEchoLayer {
                data: layer_data,
                mask: layer_mask,
                height: layer_height,
                composite,
            };
            debug!(valid = layer.valid_count(), "Built zero-echo layer");
            field.zero_layer = Some(layer);
        } else {
            for k in 0..nz {
                let mut composite = Array2::<f32>::zeros((ny, nx));
                for j in 0..ny {
                    for i in 0..nx {
                        let v = field.analysis[[k, j, i]];
                        if field.accepted[[k, j, i]] && v >= min_dbz {
                            composite[[j, i]] = v;
                        }
                    }
                }
                let halo = maximum_filter(&composite, footprint);

                for j in 0..ny {
                    for i in 0..nx {
                        if !field.accepted[[k, j, i]] {
                            continue;
                        }
                        let v = field.analysis[[k, j, i]];
                        if v >= min_dbz {
                            mask[[k, j, i]] = false;
                            data[[k, j, i]] = v;
                        } else if halo[[j, i]] > HALO_THRESHOLD {
                            if self.config.halo_policy == HaloPolicy::Retain {
                                mask[[k, j, i]] = false;
                                data[[k, j, i]] = v;
                            }
                        } else if on_stride(j, i, thin_factor) {
                            mask[[k, j, i]] = false;
                            data[[k, j, i]] = 0.0;
                        }
                    }
                }
            }
        }

        self.apply_height_ceiling(&mut mask, &field.height);
        merge_mask(field, &mask, &data);

        info!(
            field = %field.name,
            before = before,
            after = field.valid_count(),
            zero_layer = field.zero_layer.as_ref().map(|l| l.valid_count()).unwrap_or(0),
            "Masked reflectivity"
        );
    }

    /// Mask velocity using the reflectivity mask, the physical speed bound,
    /// the optional Nyquist bound and the height ceiling.
    pub fn mask_velocity(&self, vel: &mut GriddedField, reference: &GriddedField) -> Result<()> {
        if vel.data.shape() != reference.data.shape() {
            return Err(SuperobError::shape_mismatch(
                reference.data.shape(),
                vel.data.shape(),
            ));
        }
        let before = vel.valid_count();

        let mut mask = vel.mask.clone();
        if self.config.mask_velocity_with_reflectivity {
            Zip::from(&mut mask)
                .and(&reference.mask)
                .for_each(|m, &r| *m = *m || r);
        }

        let max_speed = self.config.max_radial_velocity;
        for ((k, j, i), m) in mask.indexed_iter_mut() {
            if *m {
                continue;
            }
            let speed = vel.data[[k, j, i]].abs();
            if speed > max_speed {
                *m = true;
                continue;
            }
            if let Some(factor) = self.config.max_nyquist_factor {
                let nyquist = vel.nyquist[k];
                if nyquist > 0.0 && speed > factor * nyquist {
                    *m = true;
                }
            }
        }

        self.apply_height_ceiling(&mut mask, &vel.height);
        vel.mask = mask;
        vel.apply_sentinel();

        info!(
            field = %vel.name,
            before = before,
            after = vel.valid_count(),
            "Masked velocity"
        );
        Ok(())
    }

    fn apply_height_ceiling(&self, mask: &mut Array3<bool>, height: &Array3<f32>) {
        if self.height_ceiling <= 0.0 {
            return;
        }
        let ceiling = self.height_ceiling;
        Zip::from(mask).and(height).for_each(|m, &h| {
            if !*m && f64::from(h) > ceiling {
                *m = true;
            }
        });
    }
}

/// Thinning rule shared by both zero-reflectivity branches.
fn on_stride(j: usize, i: usize, thin_factor: usize) -> bool {
    thin_factor == 0 || (j % thin_factor == 0 && i % thin_factor == 0)
}

/// OR the new mask into the field and take values where the result is unmasked.
fn merge_mask(field: &mut GriddedField, mask: &Array3<bool>, data: &Array3<f32>) {
    Zip::from(&mut field.mask)
        .and(&mut field.data)
        .and(mask)
        .and(data)
        .for_each(|m, v, &new_m, &new_v| {
            *m = *m || new_m;
            *v = if *m { MISSING } else { new_v };
        });
}
