//! Small dense linear algebra on `Array2<f64>`.
//!
//! The ICA only ever works on `K × K` (K ≤ channel count) or `C × C`
//! matrices, so cyclic Jacobi rotations and Gauss–Jordan elimination are
//! plenty; no BLAS/LAPACK is pulled in.
use ndarray::{Array1, Array2, Axis};

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns `(eigenvalues, eigenvectors)` sorted by **descending** eigenvalue;
/// eigenvector `k` is column `k`.  Returns `None` if the rotations fail to
/// converge or produce non-finite values.
pub fn symmetric_eigen(m: &Array2<f64>) -> Option<(Array1<f64>, Array2<f64>)> {
    let n = m.nrows();
    debug_assert_eq!(n, m.ncols());
    let mut a = m.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !scale.is_finite() {
        return None;
    }
    let tol = 1e-12 * scale.max(f64::MIN_POSITIVE);

    let mut converged = n < 2;
    for _sweep in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum::<f64>()
            .sqrt();
        if off <= tol {
            converged = true;
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }
    if !converged {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));
    let values = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let vectors = v.select(Axis(1), &order);
    if values.iter().chain(vectors.iter()).any(|x| !x.is_finite()) {
        return None;
    }
    Some((values, vectors))
}

/// Inverse of a square matrix by Gauss–Jordan elimination with partial
/// pivoting.  `None` if the matrix is (numerically) singular.
pub fn inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    debug_assert_eq!(n, m.ncols());
    let mut a = m.clone();
    let mut inv = Array2::<f64>::eye(n);
    let scale = m.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() <= 1e-12 * scale {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
                inv.swap([pivot, k], [col, k]);
            }
        }
        let d = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= d;
            inv[[col, k]] /= d;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let f = a[[row, col]];
            if f == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= f * a[[col, k]];
                inv[[row, k]] -= f * inv[[col, k]];
            }
        }
    }
    Some(inv)
}

/// Moore–Penrose pseudo-inverse of a full-row-rank `r × c` matrix (`r <= c`):
/// `Mᵀ (M Mᵀ)⁻¹`.
pub fn pinv_rows(m: &Array2<f64>) -> Option<Array2<f64>> {
    let gram = m.dot(&m.t());
    let gi = inverse(&gram)?;
    Some(m.t().dot(&gi))
}

/// Symmetric decorrelation `(W Wᵀ)^{-1/2} W`.
pub fn sym_decorrelation(w: &Array2<f64>) -> Option<Array2<f64>> {
    let (s, u) = symmetric_eigen(&w.dot(&w.t()))?;
    let floor = f64::MIN_POSITIVE;
    let inv_sqrt = s.mapv(|v| 1.0 / v.max(floor).sqrt());
    let scaled = &u * &inv_sqrt.view().insert_axis(Axis(0));
    Some(scaled.dot(&u.t()).dot(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn eigen_of_diagonal_sorted_descending() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 2.0]];
        let (s, _) = symmetric_eigen(&m).unwrap();
        assert_eq!(s.to_vec(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn eigen_reconstructs_matrix() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (s, u) = symmetric_eigen(&m).unwrap();
        let rec = (&u * &s.view().insert_axis(Axis(0))).dot(&u.t());
        for (a, b) in rec.iter().zip(m.iter()) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
        // Orthonormal eigenvectors.
        let eye = u.t().dot(&u);
        for ((i, j), v) in eye.indexed_iter() {
            approx::assert_abs_diff_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-10);
        }
    }

    #[test]
    fn inverse_roundtrip() {
        let m = array![[2.0, 1.0], [7.0, 4.0]];
        let inv = inverse(&m).unwrap();
        let eye = m.dot(&inv);
        approx::assert_abs_diff_eq!(eye[[0, 0]], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(eye[[0, 1]], 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(eye[[1, 0]], 0.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(eye[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_has_no_inverse() {
        assert!(inverse(&array![[1.0, 2.0], [2.0, 4.0]]).is_none());
    }

    #[test]
    fn pinv_of_wide_matrix_is_right_inverse() {
        let m = array![[1.0, 0.0, 1.0], [0.0, 2.0, 1.0]];
        let p = pinv_rows(&m).unwrap();
        let eye = m.dot(&p);
        approx::assert_abs_diff_eq!(eye[[0, 0]], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(eye[[1, 1]], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(eye[[0, 1]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn decorrelated_rows_are_orthonormal() {
        let w = array![[1.0, 0.3, 0.1], [0.2, 1.5, 0.4], [0.0, 0.7, 0.9]];
        let d = sym_decorrelation(&w).unwrap();
        let g = d.dot(&d.t());
        for ((i, j), v) in g.indexed_iter() {
            approx::assert_abs_diff_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-9);
        }
    }
}
