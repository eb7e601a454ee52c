//! Request handling for the `bifurc` binary: one JSON request in, one JSON
//! result out.

pub mod logger;
pub mod model;

use anyhow::{bail, Context, Result};
use bifurc_core::error_analysis::{fit_power, global_errors, ErrorSample, PowerFit};
use bifurc_core::grid::RangeSpec;
use bifurc_core::models::PassiveMembrane;
use bifurc_core::sweep::{frequency_scan, sweep, OscillationSettings, SweepSettings};
use bifurc_core::traits::ParameterizedModel;
use bifurc_core::trajectory::integrate;
use model::{ModelSpec, SeedSpec};
use serde::{Deserialize, Serialize};

pub const COMMANDS: [&str; 4] = ["sweep", "integrate", "frequency", "rk4-error"];

#[derive(Debug, Clone, Deserialize)]
pub struct SweepRequest {
    pub model: ModelSpec,
    pub parameters: RangeSpec,
    pub seeds: SeedSpec,
    #[serde(default)]
    pub settings: SweepSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntegrateRequest {
    pub model: ModelSpec,
    pub parameter: f64,
    pub initial_state: Vec<f64>,
    #[serde(default)]
    pub t0: f64,
    pub dt: f64,
    pub steps: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrequencyRequest {
    pub model: ModelSpec,
    pub parameters: RangeSpec,
    pub oscillation: OscillationSettings,
}

/// Global RK4 error on the passive membrane for a range of step sizes.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRequest {
    #[serde(default)]
    pub membrane: PassiveMembrane,
    pub v0: f64,
    pub horizon: f64,
    pub step_sizes: RangeSpec,
    #[serde(default = "default_order")]
    pub order: i32,
}

fn default_order() -> i32 {
    4
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub samples: Vec<ErrorSample>,
    pub fit: PowerFit,
}

/// Runs `command` on the JSON `request` and returns the pretty-printed result.
pub fn run(command: &str, request: &str) -> Result<String> {
    let output = match command {
        "sweep" => {
            let req: SweepRequest = parse(command, request)?;
            let seeds = req.seeds.build()?;
            let record = sweep(&req.model, &req.parameters.values(), &seeds, &req.settings)
                .context("Sweep failed")?;
            serde_json::to_value(&record)
        }
        "integrate" => {
            let req: IntegrateRequest = parse(command, request)?;
            let trajectory = integrate(
                &req.model.at(req.parameter),
                req.dt,
                &req.initial_state,
                req.t0,
                req.steps,
            )
            .context("Integration failed")?;
            if !trajectory.is_finite() {
                log::warn!("trajectory at p = {} contains non-finite values", req.parameter);
            }
            serde_json::to_value(&trajectory)
        }
        "frequency" => {
            let req: FrequencyRequest = parse(command, request)?;
            let points = frequency_scan(&req.model, &req.parameters.values(), &req.oscillation)
                .context("Frequency scan failed")?;
            serde_json::to_value(&points)
        }
        "rk4-error" => {
            let req: ErrorRequest = parse(command, request)?;
            let membrane = req.membrane;
            let samples = global_errors(
                &membrane,
                |t| vec![membrane.exact(t, req.v0)],
                &[req.v0],
                0.0,
                req.horizon,
                &req.step_sizes.values(),
            )
            .context("Error analysis failed")?;
            let fit = fit_power(&samples, req.order)?;
            log::info!(
                "error ~ {:e} dt^{} + {:e} (r^2 = {:.6})",
                fit.slope,
                fit.order,
                fit.intercept,
                fit.r_squared
            );
            serde_json::to_value(ErrorReport { samples, fit })
        }
        other => bail!(
            "Unknown command \"{}\". Expected one of: {}.",
            other,
            COMMANDS.join(", ")
        ),
    }
    .context("Serialization error")?;

    Ok(serde_json::to_string_pretty(&output)?)
}

fn parse<'a, T: Deserialize<'a>>(command: &str, request: &'a str) -> Result<T> {
    serde_json::from_str(request).with_context(|| format!("Invalid {} request", command))
}
