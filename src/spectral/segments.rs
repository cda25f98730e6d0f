//! Windowed, detrended, one-sided segment periodograms.
//!
//! Shared by [`welch`](super::welch) and [`spectrogram`](super::spectrogram).
//! Segment `k` starts at `k·step` (`step = nperseg − noverlap`) and there
//! are `(n − noverlap) / step` of them; partial segments are dropped.
//!
//! Each segment is:
//! 1. mean-subtracted (constant detrend),
//! 2. multiplied by the window,
//! 3. zero-padded to `nfft` and transformed,
//! 4. scaled to a one-sided density: `|X|² / (fs·Σw²)`, doubled for every
//!    bin except DC and (even `nfft`) Nyquist.
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub struct SegmentPlan {
    window: Vec<f64>,
    noverlap: usize,
    nfft: usize,
    scale: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl SegmentPlan {
    /// `window.len()` is the segment length.  Callers guarantee
    /// `noverlap < window.len() <= nfft`.
    pub fn new(window: Vec<f64>, noverlap: usize, nfft: usize, sfreq: f64) -> Self {
        debug_assert!(noverlap < window.len() && window.len() <= nfft);
        let win_sq: f64 = window.iter().map(|w| w * w).sum();
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let fft = planner.plan_fft_forward(nfft);
        Self { window, noverlap, nfft, scale: 1.0 / (sfreq * win_sq), fft }
    }

    pub fn nperseg(&self) -> usize {
        self.window.len()
    }

    pub fn step(&self) -> usize {
        self.window.len() - self.noverlap
    }

    /// Number of one-sided frequency bins, `nfft / 2 + 1`.
    pub fn n_freqs(&self) -> usize {
        self.nfft / 2 + 1
    }

    pub fn n_segments(&self, n: usize) -> usize {
        if n < self.nperseg() {
            return 0;
        }
        (n - self.noverlap) / self.step()
    }

    /// Bin frequencies `k·fs / nfft`.
    pub fn freqs(&self, sfreq: f64) -> Vec<f64> {
        (0..self.n_freqs()).map(|k| k as f64 * sfreq / self.nfft as f64).collect()
    }

    /// Segment centres in seconds.
    pub fn times(&self, n: usize, sfreq: f64) -> Vec<f64> {
        let half = self.nperseg() as f64 / 2.0;
        (0..self.n_segments(n))
            .map(|k| (half + (k * self.step()) as f64) / sfreq)
            .collect()
    }

    /// One-sided density of the segment starting at `start`.
    pub fn periodogram(&self, x: &[f64], start: usize) -> Vec<f64> {
        let seg = &x[start..start + self.nperseg()];
        let mean = seg.iter().sum::<f64>() / seg.len() as f64;

        let mut buf: Vec<Complex<f64>> = seg
            .iter()
            .zip(&self.window)
            .map(|(&v, &w)| Complex { re: (v - mean) * w, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(self.nfft)
            .collect();
        self.fft.process(&mut buf);

        let n_freqs = self.n_freqs();
        let nyquist = (self.nfft % 2 == 0).then_some(n_freqs - 1);
        buf[..n_freqs]
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let p = c.norm_sqr() * self.scale;
                if k == 0 || Some(k) == nyquist { p } else { 2.0 * p }
            })
            .collect()
    }
}
