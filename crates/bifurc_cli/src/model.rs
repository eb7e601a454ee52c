//! Built-in models and seed grids selectable from a request file.

use anyhow::Result;
use bifurc_core::grid::{AxisSpec, RangeSpec, SeedGrid};
use bifurc_core::models::{MorrisLecar, MorrisLecarParams, Pitchfork, SaddleNode, Transcritical};
use bifurc_core::traits::ParameterizedModel;
use serde::Deserialize;

/// A model chosen by name. Morris–Lecar constants not given in the request
/// keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ModelSpec {
    SaddleNode,
    Transcritical,
    Pitchfork,
    MorrisLecar(MorrisLecarParams),
}

impl ParameterizedModel for ModelSpec {
    fn dimension(&self) -> usize {
        match self {
            ModelSpec::SaddleNode => SaddleNode.dimension(),
            ModelSpec::Transcritical => Transcritical.dimension(),
            ModelSpec::Pitchfork => Pitchfork.dimension(),
            ModelSpec::MorrisLecar(p) => MorrisLecar::new(*p).dimension(),
        }
    }

    fn vector_field(&self, param: f64, state: &[f64], out: &mut [f64]) {
        match self {
            ModelSpec::SaddleNode => SaddleNode.vector_field(param, state, out),
            ModelSpec::Transcritical => Transcritical.vector_field(param, state, out),
            ModelSpec::Pitchfork => Pitchfork.vector_field(param, state, out),
            ModelSpec::MorrisLecar(p) => MorrisLecar::new(*p).vector_field(param, state, out),
        }
    }

    fn jacobian(&self, param: f64, state: &[f64], out: &mut [f64]) {
        match self {
            ModelSpec::SaddleNode => SaddleNode.jacobian(param, state, out),
            ModelSpec::Transcritical => Transcritical.jacobian(param, state, out),
            ModelSpec::Pitchfork => Pitchfork.jacobian(param, state, out),
            ModelSpec::MorrisLecar(p) => MorrisLecar::new(*p).jacobian(param, state, out),
        }
    }
}

/// Seed grid description, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedSpec {
    Points { points: Vec<Vec<f64>> },
    Uniform { range: RangeSpec },
    Cartesian { base: Vec<f64>, axes: Vec<AxisSpec> },
}

impl SeedSpec {
    pub fn build(&self) -> Result<SeedGrid> {
        match self {
            SeedSpec::Points { points } => SeedGrid::from_points(points.clone()),
            SeedSpec::Uniform { range } => SeedGrid::uniform(*range),
            SeedSpec::Cartesian { base, axes } => SeedGrid::cartesian(base, axes),
        }
    }
}
