//! Z-scores, correlation and per-channel summary statistics.
//!
//! `zscore`: `(x − μ) / (σ + 1e-6)`, population σ (ddof = 0).
//!
//! `pearson`: correlation of two equal-length series, `NaN` when either is
//! constant (the caller treats a non-finite `r` as "no match").
//!
//! `channel_stats`: `(mean, std, min, max)` per channel, ddof = 0.
use ndarray::{Array2, ArrayView1};

/// Guard added to σ so constant series map to zeros instead of NaN.
pub const ZSCORE_EPS: f64 = 1e-6;

/// Mean and population standard deviation, accumulated in `f64`.
pub fn mean_std(x: &[f64]) -> (f64, f64) {
    if x.is_empty() {
        return (0.0, 0.0);
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

/// Z-normalise one series.
pub fn zscore(x: &[f64]) -> Vec<f64> {
    let (mean, std) = mean_std(x);
    x.iter().map(|&v| (v - mean) / (std + ZSCORE_EPS)).collect()
}

/// Pearson correlation coefficient.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let (ma, sa) = mean_std(a);
    let (mb, sb) = mean_std(b);
    if sa == 0.0 || sb == 0.0 {
        return f64::NAN;
    }
    let n = a.len() as f64;
    let cov = a.iter().zip(b).map(|(&x, &y)| (x - ma) * (y - mb)).sum::<f64>() / n;
    cov / (sa * sb)
}

/// Summary statistics of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl ChannelStats {
    pub fn of(row: ArrayView1<f32>) -> Self {
        let xs: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        let (mean, std) = mean_std(&xs);
        let min = row.iter().copied().fold(f32::INFINITY, f32::min);
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Self { mean: mean as f32, std: std as f32, min, max }
    }

    /// `[mean, std, min, max]`, the per-channel time-domain feature order.
    pub fn to_array(self) -> [f32; 4] {
        [self.mean, self.std, self.min, self.max]
    }
}

/// Per-channel statistics of a `[C, T]` matrix.
pub fn channel_stats(data: &Array2<f32>) -> Vec<ChannelStats> {
    data.rows().into_iter().map(ChannelStats::of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn zscore_mean_zero_std_one() {
        let x: Vec<f64> = (0..512).map(|t| (t as f64 * 0.1).sin() * 50.0 + 3.0).collect();
        let z = zscore(&x);
        let (m, s) = mean_std(&z);
        approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(s, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn zscore_constant_signal_is_zero() {
        let z = zscore(&[7.0; 16]);
        assert!(z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pearson_of_scaled_copy() {
        let a: Vec<f64> = (0..64).map(|t| (t as f64 * 0.3).cos()).collect();
        let b: Vec<f64> = a.iter().map(|v| -2.0 * v + 1.0).collect();
        approx::assert_abs_diff_eq!(pearson(&a, &b), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_of_constant_is_nan() {
        assert!(pearson(&[1.0, 2.0, 3.0], &[4.0; 3]).is_nan());
    }

    #[test]
    fn channel_stats_population_std() {
        let data = array![[1.0_f32, 2.0, 3.0, 4.0], [5.0, 5.0, 5.0, 5.0]];
        let stats = channel_stats(&data);
        assert_eq!(stats[0].mean, 2.5);
        approx::assert_abs_diff_eq!(stats[0].std, 1.118034, epsilon = 1e-6);
        assert_eq!((stats[0].min, stats[0].max), (1.0, 4.0));
        assert_eq!(stats[1].to_array(), [5.0, 0.0, 5.0, 5.0]);
    }
}
