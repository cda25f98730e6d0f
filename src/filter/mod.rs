//! IIR filter design and zero-phase application.
//!
//! - [`design`]: 3rd-order Butterworth highpass via bilinear transform,
//!   matching `scipy.signal.butter(3, wn, btype='highpass')`.
//! - [`apply`]: `lfilter` / `lfilter_zi` / forward-backward `filtfilt` with
//!   odd padding, matching `scipy.signal.filtfilt`.

pub mod apply;
pub mod design;

pub use apply::{filtfilt, highpass_1d, highpass_zero_phase, lfilter, lfilter_zi, odd_extend};
pub use design::{butter_highpass, magnitude_at, BaCoeffs};
