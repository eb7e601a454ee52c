//! Evenly spaced parameter ranges and seed grids.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// `samples` evenly spaced values from `min` to `max`, both ends included.
pub fn linspace(min: f64, max: f64, samples: usize) -> Vec<f64> {
    match samples {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (samples - 1) as f64;
            (0..samples)
                .map(|i| if i == samples - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// An inclusive, evenly sampled range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl RangeSpec {
    pub fn new(min: f64, max: f64, samples: usize) -> Self {
        Self { min, max, samples }
    }

    pub fn values(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.samples)
    }
}

/// Sampling of one state coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub var_index: usize,
    pub range: RangeSpec,
}

/// Initial guesses for the equilibrium search, all of one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedGrid {
    seeds: Vec<Vec<f64>>,
}

impl SeedGrid {
    pub fn from_points(seeds: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = seeds.first() else {
            bail!("Seed grid must contain at least one seed.");
        };
        let dim = first.len();
        if dim == 0 {
            bail!("Seeds must have positive dimension.");
        }
        if let Some(bad) = seeds.iter().position(|s| s.len() != dim) {
            bail!(
                "Seed {} has dimension {}, expected {}.",
                bad,
                seeds[bad].len(),
                dim
            );
        }
        Ok(Self { seeds })
    }

    /// Scalar seeds for 1-D models.
    pub fn uniform(range: RangeSpec) -> Result<Self> {
        Self::from_points(range.values().into_iter().map(|x| vec![x]).collect())
    }

    /// Varies one coordinate of `base` over `range`, holding the others.
    pub fn along_axis(base: &[f64], axis: AxisSpec) -> Result<Self> {
        if axis.var_index >= base.len() {
            bail!(
                "Axis index {} out of range for dimension {}.",
                axis.var_index,
                base.len()
            );
        }
        let seeds = axis
            .range
            .values()
            .into_iter()
            .map(|value| {
                let mut seed = base.to_vec();
                seed[axis.var_index] = value;
                seed
            })
            .collect();
        Self::from_points(seeds)
    }

    /// Cartesian product of the axes over `base`; the last axis varies fastest.
    pub fn cartesian(base: &[f64], axes: &[AxisSpec]) -> Result<Self> {
        let mut seeds = vec![base.to_vec()];
        for axis in axes {
            if axis.var_index >= base.len() {
                bail!(
                    "Axis index {} out of range for dimension {}.",
                    axis.var_index,
                    base.len()
                );
            }
            let values = axis.range.values();
            seeds = seeds
                .iter()
                .flat_map(|seed| {
                    values.iter().map(move |&v| {
                        let mut next = seed.clone();
                        next[axis.var_index] = v;
                        next
                    })
                })
                .collect();
        }
        Self::from_points(seeds)
    }

    pub fn dimension(&self) -> usize {
        self.seeds[0].len()
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.seeds.iter().map(Vec::as_slice)
    }
}
