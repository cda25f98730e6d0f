//! Band power by trapezoidal integration of a PSD.
use ndarray::Array2;
use tracing::warn;

use super::welch::Psd;
use crate::config::Band;

/// Integrated power of `band` for every channel of `psd`.
///
/// Integrates over bins with `lo <= f <= hi`.  Bands covering fewer than two
/// bins cannot be integrated and give zeros.
pub fn bandpower(psd: &Psd, band: &Band) -> Vec<f32> {
    let idx: Vec<usize> = psd
        .freqs
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f >= band.lo && f <= band.hi)
        .map(|(i, _)| i)
        .collect();
    let n_ch = psd.power.nrows();
    if idx.len() < 2 {
        warn!(
            band = %band.name,
            lo = band.lo,
            hi = band.hi,
            bins = idx.len(),
            "band too narrow for PSD resolution; power set to zero"
        );
        return vec![0.0; n_ch];
    }

    psd.power
        .rows()
        .into_iter()
        .map(|row| {
            idx.windows(2)
                .map(|w| {
                    let (a, b) = (w[0], w[1]);
                    let df = (psd.freqs[b] - psd.freqs[a]) as f64;
                    0.5 * (row[a] as f64 + row[b] as f64) * df
                })
                .sum::<f64>() as f32
        })
        .collect()
}

/// `[B, C]` band powers, bands in the given order.
pub fn band_powers(psd: &Psd, bands: &[Band]) -> Array2<f32> {
    let n_ch = psd.power.nrows();
    let mut out = Array2::<f32>::zeros((bands.len(), n_ch));
    for (mut row, band) in out.rows_mut().into_iter().zip(bands) {
        row.assign(&ndarray::Array1::from(bandpower(psd, band)));
    }
    out
}
