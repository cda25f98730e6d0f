//! Welch power spectral density.
//!
//! Matches `scipy.signal.welch(x, fs, nperseg=nperseg)` with its defaults:
//! periodic Hann window, `noverlap = nperseg / 2`, `nfft = nperseg`,
//! constant detrend, one-sided density, mean over segments.  `nperseg` is
//! clamped to the signal length.
use ndarray::Array2;

use super::segments::SegmentPlan;
use super::window::hann_periodic;

/// Channel-wise PSD.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Bin frequencies in Hz, ascending.
    pub freqs: Vec<f32>,
    /// `[C, F]` density in units²/Hz.
    pub power: Array2<f32>,
}

impl Psd {
    /// Mean over channels, one value per frequency.
    pub fn channel_mean(&self) -> Vec<f32> {
        match self.power.mean_axis(ndarray::Axis(0)) {
            Some(m) => m.to_vec(),
            None => vec![0.0; self.freqs.len()],
        }
    }
}

pub fn welch(data: &Array2<f32>, sfreq: f32, nperseg: usize) -> Psd {
    let (n_ch, n_t) = data.dim();
    let nperseg = nperseg.min(n_t).max(1);
    let plan = SegmentPlan::new(hann_periodic(nperseg), nperseg / 2, nperseg, sfreq as f64);
    let freqs: Vec<f32> = plan.freqs(sfreq as f64).into_iter().map(|f| f as f32).collect();

    let n_seg = plan.n_segments(n_t);
    let mut power = Array2::<f32>::zeros((n_ch, plan.n_freqs()));
    if n_seg == 0 {
        return Psd { freqs, power };
    }

    for (mut out, row) in power.rows_mut().into_iter().zip(data.rows()) {
        let x: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        let mut acc = vec![0.0_f64; plan.n_freqs()];
        for s in 0..n_seg {
            for (a, p) in acc.iter_mut().zip(plan.periodogram(&x, s * plan.step())) {
                *a += p;
            }
        }
        for (o, a) in out.iter_mut().zip(acc) {
            *o = (a / n_seg as f64) as f32;
        }
    }
    Psd { freqs, power }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, n: usize, sfreq: f32) -> Array2<f32> {
        Array2::from_shape_fn((1, n), |(_, t)| {
            (2.0 * std::f32::consts::PI * freq * t as f32 / sfreq).sin()
        })
    }

    #[test]
    fn default_axis_is_2hz() {
        let psd = welch(&sine(10.0, 256, 256.0), 256.0, 128);
        assert_eq!(psd.freqs.len(), 65);
        assert_eq!(psd.freqs[1], 2.0);
        assert_eq!(psd.freqs[64], 128.0);
        assert_eq!(psd.power.dim(), (1, 65));
    }

    #[test]
    fn sine_peaks_at_its_frequency() {
        let psd = welch(&sine(10.0, 256, 256.0), 256.0, 128);
        let row = psd.power.row(0);
        let peak = (0..row.len()).max_by(|&a, &b| row[a].total_cmp(&row[b])).unwrap();
        assert_eq!(psd.freqs[peak], 10.0);
    }

    #[test]
    fn sine_power_integrates_to_variance() {
        // Unit sine: variance 0.5.
        let psd = welch(&sine(16.0, 256, 256.0), 256.0, 128);
        let df = psd.freqs[1];
        let total: f32 = psd.power.row(0).sum() * df;
        approx::assert_abs_diff_eq!(total, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn nperseg_clamped_to_signal() {
        let psd = welch(&sine(10.0, 64, 256.0), 256.0, 128);
        assert_eq!(psd.freqs.len(), 33);
        assert!(psd.power.iter().all(|&v| v >= 0.0));
    }
}
