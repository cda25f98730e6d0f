//! Short-time power spectrogram.
//!
//! `scipy.signal.spectrogram` defaults: periodic Tukey(0.25) window, constant
//! detrend, one-sided density, no boundary padding.  Frequencies above
//! `fmax` are dropped after the transform.
use ndarray::{Array2, Array3, Axis};

use super::segments::SegmentPlan;
use super::window::tukey_periodic;
use crate::config::SpectrogramConfig;

const TUKEY_ALPHA: f64 = 0.25;

/// Floor added before `log10` so empty bins stay finite.
pub const LOG_FLOOR: f32 = 1e-12;

#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub freqs: Vec<f32>,
    /// Segment centres in seconds.
    pub times: Vec<f32>,
    /// `[C, F, T]` density.
    pub power: Array3<f32>,
}

impl Spectrogram {
    /// `log10(mean over channels + 1e-12)`, shape `[F, T]`.
    pub fn log_image(&self) -> Array2<f32> {
        let (_, n_f, n_t) = self.power.dim();
        match self.power.mean_axis(Axis(0)) {
            Some(mean) => mean.mapv(|v| (v + LOG_FLOOR).log10()),
            None => Array2::from_elem((n_f, n_t), LOG_FLOOR.log10()),
        }
    }
}

/// Segment parameters after clamping to a signal of `n` samples:
/// `nperseg <= n`, `noverlap < nperseg`, `nfft >= nperseg`.
pub fn clamp_params(cfg: &SpectrogramConfig, n: usize) -> (usize, usize, usize) {
    let nperseg = cfg.nperseg.min(n).max(1);
    let noverlap = cfg.noverlap.min(nperseg - 1);
    let nfft = cfg.nfft.max(nperseg);
    (nperseg, noverlap, nfft)
}

pub fn spectrogram(data: &Array2<f32>, sfreq: f32, cfg: &SpectrogramConfig) -> Spectrogram {
    let (n_ch, n_t) = data.dim();
    let (nperseg, noverlap, nfft) = clamp_params(cfg, n_t);
    let plan = SegmentPlan::new(tukey_periodic(nperseg, TUKEY_ALPHA), noverlap, nfft, sfreq as f64);

    let all_freqs = plan.freqs(sfreq as f64);
    let keep = match cfg.fmax {
        Some(fmax) => all_freqs.iter().take_while(|&&f| f <= fmax as f64).count(),
        None => all_freqs.len(),
    };
    let freqs: Vec<f32> = all_freqs[..keep].iter().map(|&f| f as f32).collect();
    let times: Vec<f32> = plan.times(n_t, sfreq as f64).into_iter().map(|t| t as f32).collect();

    let n_seg = times.len();
    let mut power = Array3::<f32>::zeros((n_ch, keep, n_seg));
    for (c, row) in data.rows().into_iter().enumerate() {
        let x: Vec<f64> = row.iter().map(|&v| v as f64).collect();
        for s in 0..n_seg {
            let p = plan.periodogram(&x, s * plan.step());
            for (f, &v) in p.iter().take(keep).enumerate() {
                power[[c, f, s]] = v as f32;
            }
        }
    }
    Spectrogram { freqs, times, power }
}
