//! FastICA (parallel / symmetric, logcosh contrast).
//!
//! Follows `sklearn.decomposition.FastICA(algorithm='parallel',
//! fun='logcosh', whiten='unit-variance')`:
//!
//! ```text
//!   X₁ = whiten(X)                                      see [`whiten`]
//!   W  = sym_decorrelation(W₀)                          W₀ ~ U(−1, 1), seeded
//!   loop:
//!     G  = tanh(W·X₁),   g' = mean_t(1 − G²)
//!     W' = sym_decorrelation(G·X₁ᵀ / T − diag(g')·W)
//!     lim = max_i | |⟨W'_i, W_i⟩| − 1 |
//!     W  = W';  stop when lim < tol
//!   S          = (W·K·Xc)ᵀ / std          T × k, unit variance
//!   components = W·K / std                k × C
//!   mixing     = pinv(components)         C × k
//! ```
//!
//! The initial matrix is drawn uniformly; with a fixed seed the
//! decomposition is fully deterministic.
pub mod whiten;

use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::linalg::{pinv_rows, sym_decorrelation};
pub use whiten::{whiten, Whitened};

/// Numerical failure of the decomposition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IcaError {
    #[error("cannot extract {n_components} components from {n_channels}×{n_samples} data")]
    Shape { n_channels: usize, n_samples: usize, n_components: usize },

    #[error("input contains non-finite values")]
    NonFinite,

    #[error("data has rank {rank}, fewer than the {requested} requested components")]
    RankDeficient { rank: usize, requested: usize },

    #[error("{0} did not converge")]
    NoConvergence(&'static str),

    #[error("component {0} has zero variance")]
    ZeroVariance(usize),

    #[error("unmixing matrix is singular")]
    Singular,
}

/// FastICA parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastIca {
    pub n_components: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl FastIca {
    pub fn new(n_components: usize, seed: u64) -> Self {
        Self { n_components, max_iter: 1000, tol: 1e-4, seed }
    }

    /// Decompose `x` (`[C, T]`).
    pub fn fit(&self, x: &Array2<f64>) -> Result<IcaFit, IcaError> {
        let Whitened { mean, centred, k, x1 } = whiten(x, self.n_components)?;
        let n_c = self.n_components;
        let n_t = x1.ncols() as f64;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let w_init = Array2::from_shape_fn((n_c, n_c), |_| rng.random_range(-1.0..1.0));
        let mut w = sym_decorrelation(&w_init).ok_or(IcaError::NoConvergence("decorrelation"))?;

        let mut n_iter = 0;
        let mut converged = false;
        for it in 1..=self.max_iter {
            n_iter = it;
            let g = w.dot(&x1).mapv(f64::tanh);
            let g_prime: Array1<f64> = g
                .mapv(|v| 1.0 - v * v)
                .mean_axis(Axis(1))
                .ok_or(IcaError::NonFinite)?;

            let update = g.dot(&x1.t()) / n_t - &(&w * &g_prime.view().insert_axis(Axis(1)));
            let w1 = sym_decorrelation(&update).ok_or(IcaError::NoConvergence("decorrelation"))?;

            let lim = w1
                .rows()
                .into_iter()
                .zip(w.rows())
                .map(|(a, b)| (a.dot(&b).abs() - 1.0).abs())
                .fold(0.0_f64, f64::max);
            w = w1;
            if !lim.is_finite() {
                return Err(IcaError::NonFinite);
            }
            if lim < self.tol {
                converged = true;
                break;
            }
        }
        if converged {
            debug!(n_iter, "FastICA converged");
        } else {
            warn!(max_iter = self.max_iter, "FastICA did not converge; using last iterate");
        }

        let unmix = w.dot(&k);
        let mut sources = unmix.dot(&centred).reversed_axes();
        let mut components = unmix;
        let pairs = sources.columns_mut().into_iter().zip(components.rows_mut());
        for (i, (mut s, mut c)) in pairs.enumerate() {
            let std = s.std(0.0);
            if !(std.is_finite() && std > 0.0) {
                return Err(IcaError::ZeroVariance(i));
            }
            s.mapv_inplace(|v| v / std);
            c.mapv_inplace(|v| v / std);
        }
        let mixing = pinv_rows(&components).ok_or(IcaError::Singular)?;

        Ok(IcaFit { sources, components, mixing, mean, n_iter, converged })
    }
}

/// Result of [`FastIca::fit`].
#[derive(Debug, Clone)]
pub struct IcaFit {
    /// Unit-variance sources `[T, k]`.
    pub sources: Array2<f64>,
    /// Unmixing matrix `[k, C]`.
    pub components: Array2<f64>,
    /// Mixing matrix `[C, k]`.
    pub mixing: Array2<f64>,
    /// Channel means `[C]`.
    pub mean: Array1<f64>,
    pub n_iter: usize,
    pub converged: bool,
}

impl IcaFit {
    /// Back-project sources `[T, k]` to channel space `[C, T]`:
    /// `(S·Aᵀ + mean)ᵀ`.
    pub fn reconstruct(&self, sources: &Array2<f64>) -> Array2<f64> {
        let x = sources.dot(&self.mixing.t()) + &self.mean.view().insert_axis(Axis(0));
        x.reversed_axes()
    }
}
