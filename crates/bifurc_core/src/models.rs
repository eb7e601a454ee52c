//! Reference models used by the sweep tests and the CLI.
//!
//! The one-dimensional normal forms take the bifurcation parameter `r`;
//! Morris–Lecar takes the applied current `I_app`.

use crate::traits::{DynamicalSystem, ParameterizedModel};
use serde::{Deserialize, Serialize};

/// Saddle-node normal form `dx/dt = x^2 - r`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SaddleNode;

impl ParameterizedModel for SaddleNode {
    fn dimension(&self) -> usize {
        1
    }

    fn vector_field(&self, r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[0] * x[0] - r;
    }

    fn jacobian(&self, _r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = 2.0 * x[0];
    }
}

/// Transcritical normal form `dx/dt = r x - x^2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcritical;

impl ParameterizedModel for Transcritical {
    fn dimension(&self) -> usize {
        1
    }

    fn vector_field(&self, r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = r * x[0] - x[0] * x[0];
    }

    fn jacobian(&self, r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = r - 2.0 * x[0];
    }
}

/// Supercritical pitchfork normal form `dx/dt = r x - x^3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pitchfork;

impl ParameterizedModel for Pitchfork {
    fn dimension(&self) -> usize {
        1
    }

    fn vector_field(&self, r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = r * x[0] - x[0].powi(3);
    }

    fn jacobian(&self, r: f64, x: &[f64], out: &mut [f64]) {
        out[0] = r - 3.0 * x[0] * x[0];
    }
}

/// Conductances (mS/cm^2), reversal potentials (mV) and gating constants of
/// the Morris–Lecar neuron.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorrisLecarParams {
    pub g_ca: f64,
    pub g_k: f64,
    pub g_leak: f64,
    pub e_ca: f64,
    pub e_k: f64,
    pub e_leak: f64,
    pub phi: f64,
    pub capacitance: f64,
    pub v_ca: f64,
    pub v_k: f64,
    pub theta_ca: f64,
    pub theta_k: f64,
}

impl Default for MorrisLecarParams {
    fn default() -> Self {
        Self {
            g_ca: 20.0,
            g_k: 20.0,
            g_leak: 2.0,
            e_ca: 50.0,
            e_k: -100.0,
            e_leak: -70.0,
            phi: 0.15,
            capacitance: 2.0,
            v_ca: 0.0,
            v_k: -10.0,
            theta_ca: 18.0,
            theta_k: 13.0,
        }
    }
}

/// Two-variable Morris–Lecar neuron, state `[v, w]` with `v` in mV and `t`
/// in ms. The scan parameter is the applied current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MorrisLecar {
    pub params: MorrisLecarParams,
}

impl MorrisLecar {
    pub fn new(params: MorrisLecarParams) -> Self {
        Self { params }
    }

    /// Default constants with the calcium half-activation moved to `v_ca`.
    pub fn with_v_ca(v_ca: f64) -> Self {
        Self::new(MorrisLecarParams {
            v_ca,
            ..MorrisLecarParams::default()
        })
    }

    pub fn m_inf(&self, v: f64) -> f64 {
        let p = &self.params;
        0.5 * (1.0 + ((v - p.v_ca) / p.theta_ca).tanh())
    }

    pub fn w_inf(&self, v: f64) -> f64 {
        let p = &self.params;
        0.5 * (1.0 + ((v - p.v_k) / p.theta_k).tanh())
    }

    pub fn tau_w(&self, v: f64) -> f64 {
        let p = &self.params;
        1.0 / ((v - p.v_k) / (2.0 * p.theta_k)).cosh()
    }
}

impl ParameterizedModel for MorrisLecar {
    fn dimension(&self) -> usize {
        2
    }

    fn vector_field(&self, i_app: f64, x: &[f64], out: &mut [f64]) {
        let p = &self.params;
        let (v, w) = (x[0], x[1]);
        let i_ca = p.g_ca * self.m_inf(v) * (p.e_ca - v);
        let i_k = p.g_k * w * (p.e_k - v);
        let i_leak = p.g_leak * (p.e_leak - v);
        out[0] = (i_ca + i_k + i_leak + i_app) / p.capacitance;
        out[1] = p.phi * (self.w_inf(v) - w) / self.tau_w(v);
    }

    fn jacobian(&self, _i_app: f64, x: &[f64], out: &mut [f64]) {
        let p = &self.params;
        let (v, w) = (x[0], x[1]);

        let dm = 1.0 / (2.0 * p.theta_ca * ((v - p.v_ca) / p.theta_ca).cosh().powi(2));
        let dw_inf = 1.0 / (2.0 * p.theta_k * ((v - p.v_k) / p.theta_k).cosh().powi(2));
        let u = (v - p.v_k) / (2.0 * p.theta_k);

        out[0] = (p.g_ca * (dm * (p.e_ca - v) - self.m_inf(v)) - p.g_k * w - p.g_leak)
            / p.capacitance;
        out[1] = p.g_k * (p.e_k - v) / p.capacitance;
        out[2] = p.phi * (dw_inf * u.cosh() + (self.w_inf(v) - w) * u.sinh() / (2.0 * p.theta_k));
        out[3] = -p.phi * u.cosh();
    }
}

/// Passive membrane `dv/dt = g/C (E - v)`, a linear ODE with a closed form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassiveMembrane {
    pub conductance: f64,
    pub capacitance: f64,
    pub reversal: f64,
}

impl Default for PassiveMembrane {
    fn default() -> Self {
        Self {
            conductance: 0.0144,
            capacitance: 0.98,
            reversal: -93.6,
        }
    }
}

impl PassiveMembrane {
    /// Membrane potential at `t` when starting from `v0` at `t = 0`.
    pub fn exact(&self, t: f64, v0: f64) -> f64 {
        let rate = self.conductance / self.capacitance;
        self.reversal - (-rate * t).exp() * (self.reversal - v0)
    }
}

impl DynamicalSystem<f64> for PassiveMembrane {
    fn dimension(&self) -> usize {
        1
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = self.conductance / self.capacitance * (self.reversal - x[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::{classify_equilibrium, solve_equilibrium, Stability};
    use crate::newton::NewtonSettings;
    use crate::trajectory::integrate;
    use approx::assert_relative_eq;

    fn finite_difference_jacobian<M: ParameterizedModel>(
        model: &M,
        param: f64,
        x: &[f64],
    ) -> Vec<f64> {
        let dim = model.dimension();
        let h = 1e-6;
        let mut jac = vec![0.0; dim * dim];
        let mut plus = vec![0.0; dim];
        let mut minus = vec![0.0; dim];
        for j in 0..dim {
            let mut xp = x.to_vec();
            let mut xm = x.to_vec();
            xp[j] += h;
            xm[j] -= h;
            model.vector_field(param, &xp, &mut plus);
            model.vector_field(param, &xm, &mut minus);
            for i in 0..dim {
                jac[i * dim + j] = (plus[i] - minus[i]) / (2.0 * h);
            }
        }
        jac
    }

    #[test]
    fn normal_form_derivatives_match_finite_differences() {
        fn check<M: ParameterizedModel>(model: &M) {
            for x in [-1.7, -0.2, 0.0, 0.9, 2.3] {
                let mut exact = [0.0];
                model.jacobian(0.8, &[x], &mut exact);
                let approx = finite_difference_jacobian(model, 0.8, &[x]);
                assert!((exact[0] - approx[0]).abs() < 1e-6, "x = {x}");
            }
        }
        check(&SaddleNode);
        check(&Transcritical);
        check(&Pitchfork);
    }

    #[test]
    fn pitchfork_origin_loses_stability_at_zero() {
        let before = classify_equilibrium(&Pitchfork, -0.5, vec![0.0]).expect("valid state");
        let after = classify_equilibrium(&Pitchfork, 0.5, vec![0.0]).expect("valid state");
        let branch =
            classify_equilibrium(&Pitchfork, 0.5, vec![0.5f64.sqrt()]).expect("valid state");
        assert_eq!(before.stability, Stability::Stable);
        assert_eq!(after.stability, Stability::Unstable);
        assert_eq!(branch.stability, Stability::Stable);
    }

    #[test]
    fn morris_lecar_jacobian_matches_finite_differences() {
        let model = MorrisLecar::default();
        for state in [[-20.0, 0.1], [-60.0, 0.01], [10.0, 0.4]] {
            let mut exact = [0.0; 4];
            model.jacobian(50.0, &state, &mut exact);
            let approx = finite_difference_jacobian(&model, 50.0, &state);
            for (a, b) in exact.iter().zip(&approx) {
                assert!((a - b).abs() < 1e-5 * (1.0 + b.abs()), "{exact:?} vs {approx:?}");
            }
        }
    }

    #[test]
    fn morris_lecar_resting_state() {
        let model = MorrisLecar::default();
        let result = solve_equilibrium(&model, 0.0, &[-70.0, 0.0], NewtonSettings::default())
            .expect("valid input");
        let state = result.root().expect("converges").clone();
        assert!((state[0] + 69.50343).abs() < 1e-4);
        assert!((state[1] - model.w_inf(state[0])).abs() < 1e-10);

        let rest = classify_equilibrium(&model, 0.0, state).expect("valid state");
        assert_eq!(rest.stability, Stability::Stable);
    }

    #[test]
    fn morris_lecar_depolarized_equilibrium_is_unstable() {
        let model = MorrisLecar::default();
        let result = solve_equilibrium(&model, 80.0, &[-30.0, 0.0], NewtonSettings::default())
            .expect("valid input");
        let state = result.root().expect("converges").clone();
        assert!((state[0] + 31.06268).abs() < 1e-4);
        let eq = classify_equilibrium(&model, 80.0, state).expect("valid state");
        assert_eq!(eq.stability, Stability::Unstable);
        assert!(eq.eigenvalues.iter().all(|l| l.im.abs() > 0.0));
    }

    #[test]
    fn with_v_ca_only_moves_calcium_activation() {
        let shifted = MorrisLecar::with_v_ca(-1.2);
        assert_eq!(shifted.params.v_ca, -1.2);
        assert_eq!(shifted.params.g_k, MorrisLecarParams::default().g_k);
        assert_relative_eq!(shifted.m_inf(-1.2), 0.5);
    }

    #[test]
    fn passive_membrane_relaxes_to_reversal() {
        let membrane = PassiveMembrane::default();
        let v0 = -50.0;
        let trajectory = integrate(&membrane, 0.5, &[v0], 0.0, 400).expect("valid input");
        let t = trajectory.final_time();
        assert_relative_eq!(t, 200.0, epsilon = 1e-9);
        assert!((trajectory.final_state()[0] - membrane.exact(t, v0)).abs() < 1e-9);
        assert_relative_eq!(membrane.exact(0.0, v0), v0);
        assert!((membrane.exact(1e5, v0) - membrane.reversal).abs() < 1e-9);
    }
}
