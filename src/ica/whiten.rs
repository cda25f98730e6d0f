//! Centring and PCA whitening ahead of FastICA.
//!
//! For `X` of shape `[C, T]` (channels × samples):
//!
//! ```text
//!   Xc = X − mean_t(X)
//!   Xc·Xcᵀ = U·diag(λ)·Uᵀ          (λ descending, U sign-fixed on row 0)
//!   K  = (U / √λ)ᵀ[:k]              k × C
//!   X₁ = K·Xc·√T                    k × T, identity covariance
//! ```
use ndarray::{Array1, Array2, Axis};

use super::IcaError;
use crate::linalg::symmetric_eigen;

/// Eigenvalues below this fraction of the largest one count as zero.
const RANK_TOL: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Whitened {
    /// Per-channel mean removed before whitening, length C.
    pub mean: Array1<f64>,
    /// Centred data `[C, T]`.
    pub centred: Array2<f64>,
    /// Whitening matrix `[k, C]`.
    pub k: Array2<f64>,
    /// Whitened data `[k, T]`.
    pub x1: Array2<f64>,
}

pub fn whiten(x: &Array2<f64>, n_components: usize) -> Result<Whitened, IcaError> {
    let (n_ch, n_t) = x.dim();
    if n_components == 0 || n_components > n_ch || n_t < 2 {
        return Err(IcaError::Shape { n_channels: n_ch, n_samples: n_t, n_components });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(IcaError::NonFinite);
    }

    let mean = x.mean_axis(Axis(1)).ok_or(IcaError::NonFinite)?;
    let centred = x - &mean.view().insert_axis(Axis(1));

    let cov = centred.dot(&centred.t());
    let (lambda, mut u) =
        symmetric_eigen(&cov).ok_or(IcaError::NoConvergence("eigen-decomposition"))?;

    let top = lambda[0];
    if top <= 0.0 {
        return Err(IcaError::RankDeficient { rank: 0, requested: n_components });
    }
    let rank = lambda.iter().take_while(|&&l| l > RANK_TOL * top).count();
    if rank < n_components {
        return Err(IcaError::RankDeficient { rank, requested: n_components });
    }

    // Deterministic signs: first row of every eigenvector non-negative.
    for mut col in u.columns_mut() {
        if col[0] < 0.0 {
            col.mapv_inplace(|v| -v);
        }
    }

    let mut k = Array2::<f64>::zeros((n_components, n_ch));
    for (i, mut row) in k.rows_mut().into_iter().enumerate() {
        let d = lambda[i].sqrt();
        row.assign(&u.column(i).mapv(|v| v / d));
    }
    let x1 = k.dot(&centred) * (n_t as f64).sqrt();

    Ok(Whitened { mean, centred, k, x1 })
}
