//! Parameter sweep: equilibria, their stability, and the oscillation that
//! takes over once the stable branch is gone.
//!
//! A sweep runs in two phases. First every parameter value is solved
//! independently from the whole seed grid. The largest parameter with a
//! stable equilibrium is then taken as the onset threshold, and only
//! parameter values beyond it are integrated to characterize the limit
//! cycle. Both phases fan out over rayon and collect in input order.

use crate::dedup::push_distinct;
use crate::equilibrium::{classify_equilibrium, solve_equilibrium, Equilibrium};
use crate::error::{OscillationError, RootFailure};
use crate::grid::SeedGrid;
use crate::newton::NewtonSettings;
use crate::peaks::{envelope, extract_frequency, PeakSettings};
use crate::traits::ParameterizedModel;
use crate::trajectory::integrate;
use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How to integrate the model when probing for a limit cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillationSettings {
    pub initial_state: Vec<f64>,
    #[serde(default)]
    pub t0: f64,
    pub dt: f64,
    pub steps: usize,
    /// State component whose envelope and peaks are measured.
    #[serde(default)]
    pub component: usize,
    /// Leading samples dropped before measuring, to skip the transient.
    #[serde(default)]
    pub transient_steps: usize,
    #[serde(default)]
    pub peaks: PeakSettings,
}

impl OscillationSettings {
    pub fn validate(&self, dimension: usize) -> Result<()> {
        if self.initial_state.len() != dimension {
            bail!(
                "Initial state dimension mismatch. Expected {}, got {}.",
                dimension,
                self.initial_state.len()
            );
        }
        if !self.dt.is_finite() || self.dt == 0.0 {
            bail!("Integration step must be finite and non-zero.");
        }
        if self.steps == 0 {
            bail!("Integration needs at least one step.");
        }
        if self.component >= dimension {
            bail!(
                "Component index {} out of range for dimension {}.",
                self.component,
                dimension
            );
        }
        if self.transient_steps >= self.steps {
            bail!(
                "Transient of {} steps leaves no samples out of {}.",
                self.transient_steps,
                self.steps
            );
        }
        if !self.peaks.time_scale.is_finite() || self.peaks.time_scale == 0.0 {
            bail!("Peak time scale must be finite and non-zero.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// When absent, chosen by model dimension with [`SweepSettings::newton_for`].
    #[serde(default)]
    pub newton: Option<NewtonSettings>,
    /// Decimal places used to merge roots found from different seeds.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// When absent, the sweep stops after classifying equilibria.
    #[serde(default)]
    pub oscillation: Option<OscillationSettings>,
}

fn default_decimals() -> u32 {
    5
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            newton: None,
            decimals: default_decimals(),
            oscillation: None,
        }
    }
}

impl SweepSettings {
    /// Explicit settings if given, else [`NewtonSettings::scalar`] for 1-D
    /// models and [`NewtonSettings::default`] otherwise.
    pub fn newton_for(&self, dimension: usize) -> NewtonSettings {
        self.newton.unwrap_or_else(|| {
            if dimension == 1 {
                NewtonSettings::scalar()
            } else {
                NewtonSettings::default()
            }
        })
    }
}

/// Seeds that did not converge at one parameter value, by failure kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailures {
    pub singular: usize,
    pub max_iterations: usize,
}

impl SeedFailures {
    fn record(&mut self, failure: RootFailure) {
        match failure {
            RootFailure::ZeroOrSingularDerivative => self.singular += 1,
            RootFailure::MaxIterationsExceeded => self.max_iterations += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.singular + self.max_iterations
    }
}

/// Envelope and frequency of the measured component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitCycle {
    pub max: f64,
    pub min: f64,
    /// `None` when fewer than two peaks cleared the threshold.
    pub frequency: Option<f64>,
}

/// Outcome of integrating one parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationReport {
    /// Absent when the trajectory left the finite range.
    pub limit_cycle: Option<LimitCycle>,
    pub failure: Option<OscillationError>,
}

impl OscillationReport {
    pub fn frequency(&self) -> Option<f64> {
        self.limit_cycle.and_then(|cycle| cycle.frequency)
    }
}

/// Everything found at one value of the scan parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSlice {
    pub parameter: f64,
    /// Distinct equilibria in first-seen seed order, states rounded.
    pub equilibria: Vec<Equilibrium>,
    pub failed_seeds: SeedFailures,
    /// Present only for parameter values past the last stable equilibrium.
    pub oscillation: Option<OscillationReport>,
}

impl ParameterSlice {
    pub fn has_stable_equilibrium(&self) -> bool {
        self.equilibria.iter().any(|eq| eq.stability.is_stable())
    }
}

/// Sweep result, one slice per parameter value in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BifurcationRecord {
    pub slices: Vec<ParameterSlice>,
}

impl BifurcationRecord {
    /// Largest parameter value with at least one stable equilibrium.
    pub fn last_stable_parameter(&self) -> Option<f64> {
        self.slices
            .iter()
            .filter(|slice| slice.has_stable_equilibrium())
            .map(|slice| slice.parameter)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
    }

    pub fn stable_points(&self) -> impl Iterator<Item = &Equilibrium> + '_ {
        self.equilibria().filter(|eq| eq.stability.is_stable())
    }

    pub fn unstable_points(&self) -> impl Iterator<Item = &Equilibrium> + '_ {
        self.equilibria().filter(|eq| !eq.stability.is_stable())
    }

    pub fn equilibria(&self) -> impl Iterator<Item = &Equilibrium> + '_ {
        self.slices.iter().flat_map(|slice| slice.equilibria.iter())
    }

    /// `(parameter, limit cycle)` for every slice with a finite envelope.
    pub fn envelope(&self) -> Vec<(f64, LimitCycle)> {
        self.slices
            .iter()
            .filter_map(|slice| {
                let cycle = slice.oscillation?.limit_cycle?;
                Some((slice.parameter, cycle))
            })
            .collect()
    }

    pub fn total_failed_seeds(&self) -> usize {
        self.slices.iter().map(|s| s.failed_seeds.total()).sum()
    }
}

/// Solves for equilibria at `param` from every seed, merges them, and
/// classifies each. Failed seeds are counted, not returned.
pub fn equilibria_at<M: ParameterizedModel>(
    model: &M,
    param: f64,
    seeds: &SeedGrid,
    newton: NewtonSettings,
    decimals: u32,
) -> Result<(Vec<Equilibrium>, SeedFailures)> {
    let mut distinct: Vec<Vec<f64>> = Vec::new();
    let mut equilibria = Vec::new();
    let mut failures = SeedFailures::default();

    for seed in seeds.iter() {
        let result = solve_equilibrium(model, param, seed, newton)?;
        if let Some(failure) = result.failure {
            failures.record(failure);
            continue;
        }
        if push_distinct(&mut distinct, &result.value, decimals) {
            let mut equilibrium = classify_equilibrium(model, param, result.value)?;
            if let Some(rounded) = distinct.last() {
                equilibrium.state = rounded.clone();
            }
            equilibria.push(equilibrium);
        }
    }

    log::debug!(
        "p = {param}: {} equilibria, {} of {} seeds failed",
        equilibria.len(),
        failures.total(),
        seeds.len()
    );
    Ok((equilibria, failures))
}

/// Integrates the model at `param` and measures the selected component.
pub fn probe_oscillation<M: ParameterizedModel>(
    model: &M,
    param: f64,
    settings: &OscillationSettings,
) -> Result<OscillationReport> {
    settings.validate(model.dimension())?;
    let trajectory = integrate(
        &model.at(param),
        settings.dt,
        &settings.initial_state,
        settings.t0,
        settings.steps,
    )?;
    let signal = trajectory.component(settings.component);
    let signal = &signal[settings.transient_steps..];

    let Some((max, min)) = envelope(signal) else {
        log::warn!("p = {param}: trajectory contains non-finite values");
        return Ok(OscillationReport {
            limit_cycle: None,
            failure: Some(OscillationError::NumericOverflow),
        });
    };

    let (frequency, failure) = match extract_frequency(signal, settings.dt, settings.peaks) {
        Ok(frequency) => (Some(frequency), None),
        Err(err) => (None, Some(err)),
    };
    Ok(OscillationReport {
        limit_cycle: Some(LimitCycle {
            max,
            min,
            frequency,
        }),
        failure,
    })
}

/// Runs the full bifurcation pipeline over `parameters`.
pub fn sweep<M: ParameterizedModel>(
    model: &M,
    parameters: &[f64],
    seeds: &SeedGrid,
    settings: &SweepSettings,
) -> Result<BifurcationRecord> {
    let dim = model.dimension();
    let newton = settings.newton_for(dim);
    newton.validate()?;
    if seeds.dimension() != dim {
        bail!(
            "Seed dimension mismatch. Expected {}, got {}.",
            dim,
            seeds.dimension()
        );
    }
    if let Some(bad) = parameters.iter().find(|p| !p.is_finite()) {
        bail!("Parameter values must be finite, got {}.", bad);
    }
    if let Some(oscillation) = &settings.oscillation {
        oscillation.validate(dim)?;
    }

    let slices = parameters
        .par_iter()
        .map(|&param| {
            let (equilibria, failed_seeds) =
                equilibria_at(model, param, seeds, newton, settings.decimals)?;
            Ok(ParameterSlice {
                parameter: param,
                equilibria,
                failed_seeds,
                oscillation: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let mut record = BifurcationRecord { slices };

    let threshold = record.last_stable_parameter();
    if let Some(oscillation) = &settings.oscillation {
        let past_onset = |p: f64| threshold.map_or(true, |t| p > t);
        let reports = record
            .slices
            .par_iter()
            .map(|slice| {
                if past_onset(slice.parameter) {
                    probe_oscillation(model, slice.parameter, oscillation).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        for (slice, report) in record.slices.iter_mut().zip(reports) {
            slice.oscillation = report;
        }
    }

    log::info!(
        "swept {} parameter values: {} equilibria, {} failed seeds, last stable at {:?}",
        record.slices.len(),
        record.equilibria().count(),
        record.total_failed_seeds(),
        threshold
    );
    Ok(record)
}

/// Spike frequency at one parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPoint {
    pub parameter: f64,
    pub frequency: Option<f64>,
}

/// Integrates the model at every parameter value and reports the frequency,
/// without looking for equilibria.
pub fn frequency_scan<M: ParameterizedModel>(
    model: &M,
    parameters: &[f64],
    settings: &OscillationSettings,
) -> Result<Vec<FrequencyPoint>> {
    settings.validate(model.dimension())?;
    parameters
        .par_iter()
        .map(|&parameter| {
            let report = probe_oscillation(model, parameter, settings)?;
            Ok(FrequencyPoint {
                parameter,
                frequency: report.frequency(),
            })
        })
        .collect()
}
