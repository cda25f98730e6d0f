//! Frequency-domain estimators.
//!
//! - [`welch`]: channel-wise Welch PSD (periodic Hann, 50 % overlap).
//! - [`bandpower`]: trapezoidal band integration of a PSD.
//! - [`spectrogram`]: short-time density (periodic Tukey 0.25), truncated
//!   to `fmax`.
//!
//! All estimators detrend each segment by its mean and use one-sided
//! density scaling, see [`segments`].

pub mod bandpower;
pub mod segments;
pub mod spectrogram;
pub mod welch;
pub mod window;

pub use bandpower::{band_powers, bandpower};
pub use spectrogram::{spectrogram, Spectrogram};
pub use welch::{welch, Psd};
