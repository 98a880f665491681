// ============================================================
// Layer 4 — High-pass Butterworth Filter
// ============================================================
// Removes slow drifts from each channel before segmentation.
//
// Design:
//   An order-4 Butterworth high-pass is built as a cascade of
//   two second-order sections (biquads). Each section is the
//   biquad crate's high-pass (bilinear transform with frequency
//   pre-warping) at the quality factor of its Butterworth pole
//   pair:
//
//     Q_k = 1 / (2·cos(π·(2k+1) / (2·order)))   k = 0..order/2
//
// Application (zero phase):
//   1. extend the signal at both ends by odd reflection
//   2. run the cascade forward, starting from the steady-state
//      response to the first sample
//   3. run it again over the reversed output
//   4. reverse and strip the padding
//
//   Filtering twice squares the magnitude response and cancels
//   the phase shift, so segment boundaries line up in time.
//
// Reference: Oppenheim & Schafer, Discrete-Time Signal Processing §7
//            RBJ Audio EQ Cookbook (biquad high-pass)
//            Gustafsson (1996) forward-backward initial conditions

use std::f64::consts::PI;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use ndarray::{Array3, Axis};

use crate::domain::error::PipelineError;

/// Filter order applied to every recording.
pub const FILTER_ORDER: usize = 4;

/// One second-order section, `a0` normalised to 1.
pub type Sos = Coefficients<f64>;

/// Pole-pair quality factors of an even-order Butterworth filter.
pub fn butterworth_q(order: usize) -> Vec<f64> {
    (0..order / 2)
        .map(|k| {
            let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
            1.0 / (2.0 * theta.cos())
        })
        .collect()
}

/// Design a Butterworth high-pass of even `order` as second-order sections.
pub fn butter_highpass(order: usize, cutoff: f64, sfreq: f64) -> Result<Vec<Sos>, PipelineError> {
    if order == 0 || order % 2 != 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "filter order must be a positive even number, got {order}"
        )));
    }
    let nyquist = sfreq / 2.0;
    if !(cutoff > 0.0 && cutoff < nyquist) {
        return Err(PipelineError::InvalidConfig(format!(
            "high-pass cutoff {cutoff} Hz must lie in (0, {nyquist}) Hz"
        )));
    }

    butterworth_q(order)
        .into_iter()
        .map(|q| {
            Coefficients::<f64>::from_params(Type::HighPass, sfreq.hz(), cutoff.hz(), q)
                .map_err(|e| PipelineError::InvalidConfig(format!("high-pass section: {e:?}")))
        })
        .collect()
}

fn dc_gain(s: &Sos) -> f64 {
    (s.b0 + s.b1 + s.b2) / (1.0 + s.a1 + s.a2)
}

/// Padding used at each end of the signal before filtering twice.
pub fn pad_length(sos: &[Sos]) -> usize {
    let zero_b2 = sos.iter().filter(|s| s.b2 == 0.0).count();
    let zero_a2 = sos.iter().filter(|s| s.a2 == 0.0).count();
    3 * (2 * sos.len() + 1 - zero_b2.min(zero_a2))
}

/// Per-section state for a unit-step steady state.
fn steady_state(sos: &[Sos]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sos.iter()
        .map(|s| {
            let g  = dc_gain(s);
            let s2 = s.b2 - s.a2 * g;
            let s1 = s.b1 - s.a1 * g + s2;
            let zi = [scale * s1, scale * s2];
            scale *= g;
            zi
        })
        .collect()
}

// One section after the other, in place, each started as if the
// first input sample had always been there.
fn run_cascade(sos: &[Sos], zi: &[[f64; 2]], signal: &mut [f64]) {
    let Some(&x0) = signal.first() else { return };
    for (coeffs, z) in sos.iter().zip(zi) {
        let mut section = DirectForm2Transposed::<f64>::new(*coeffs);
        section.s1 = z[0] * x0;
        section.s2 = z[1] * x0;
        for v in signal.iter_mut() {
            *v = section.run(*v);
        }
    }
}

/// Zero-phase filtering of one signal.
pub fn sosfiltfilt(sos: &[Sos], signal: &[f64]) -> Result<Vec<f64>, PipelineError> {
    let n      = signal.len();
    let padlen = pad_length(sos);
    if n <= padlen {
        return Err(PipelineError::SignalTooShort { len: n, padlen });
    }

    // odd extension: 2·x[0] − x[padlen..1], x, 2·x[n−1] − x[n−2..n−1−padlen]
    let first = signal[0];
    let last  = signal[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
    ext.extend_from_slice(signal);
    ext.extend((n - 1 - padlen..n - 1).rev().map(|i| 2.0 * last - signal[i]));

    let zi = steady_state(sos);

    run_cascade(sos, &zi, &mut ext);
    ext.reverse();
    run_cascade(sos, &zi, &mut ext);
    ext.reverse();

    Ok(ext[padlen..padlen + n].to_vec())
}

/// High-pass every [subject, channel] lane of `data` in place.
pub fn highpass_inplace(data: &mut Array3<f32>, cutoff: f64, sfreq: f64) -> Result<(), PipelineError> {
    let sos = butter_highpass(FILTER_ORDER, cutoff, sfreq)?;
    let mut scratch: Vec<f64> = Vec::with_capacity(data.dim().2);

    for mut lane in data.lanes_mut(Axis(2)) {
        scratch.clear();
        scratch.extend(lane.iter().map(|&v| v as f64));
        let filtered = sosfiltfilt(&sos, &scratch)?;
        for (dst, src) in lane.iter_mut().zip(filtered) {
            *dst = src as f32;
        }
    }

    tracing::debug!(
        "High-pass {} Hz (order {}) applied to {} lanes",
        cutoff,
        FILTER_ORDER,
        data.dim().0 * data.dim().1
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_four_has_two_sections() {
        let sos = butter_highpass(4, 0.5, 128.0).unwrap();
        assert_eq!(sos.len(), 2);
        assert_eq!(pad_length(&sos), 15);
        // high-pass: zero gain at DC
        for s in &sos {
            assert!(dc_gain(s).abs() < 1e-12);
        }
    }

    #[test]
    fn test_butterworth_quality_factors() {
        let q = butterworth_q(4);
        assert!((q[0] - 0.541_196_1).abs() < 1e-6);
        assert!((q[1] - 1.306_563_0).abs() < 1e-6);
        assert!((butterworth_q(2)[0] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_phase_magnitude_matches_butterworth() {
        // forward-backward squares the response: 1 / (1 + (Kc / Kf)^8)
        let (fs, fc) = (128.0, 0.5);
        let sos = butter_highpass(4, fc, fs).unwrap();
        let kc = (PI * fc / fs).tan();

        for (f, rounded) in [(0.25, 0.00389), (0.5, 0.5), (1.0, 0.99611), (2.0, 0.99998)] {
            let sine: Vec<f64> = (0..8192).map(|t| (2.0 * PI * f * t as f64 / fs).sin()).collect();
            let out = sosfiltfilt(&sos, &sine).unwrap();
            let amplitude = out[3072..5120].iter().fold(0.0f64, |m, v| m.max(v.abs()));

            let expected = 1.0 / (1.0 + (kc / (PI * f / fs).tan()).powi(8));
            assert!((expected - rounded).abs() < 1e-5, "f={f}: {expected}");
            assert!((amplitude - expected).abs() < 1e-3, "f={f}: {amplitude} vs {expected}");
        }
    }

    #[test]
    fn test_invalid_design_parameters() {
        assert!(butter_highpass(3, 0.5, 128.0).is_err());
        assert!(butter_highpass(4, 0.0, 128.0).is_err());
        assert!(butter_highpass(4, 64.0, 128.0).is_err());
    }

    #[test]
    fn test_constant_signal_is_removed() {
        let sos = butter_highpass(4, 0.5, 128.0).unwrap();
        let out = sosfiltfilt(&sos, &vec![3.0; 512]).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_passband_sine_is_preserved() {
        let sos = butter_highpass(4, 0.5, 128.0).unwrap();
        let sine: Vec<f64> = (0..1024)
            .map(|t| (2.0 * PI * 10.0 * t as f64 / 128.0).sin())
            .collect();
        let out = sosfiltfilt(&sos, &sine).unwrap();
        // compare away from the edges
        for t in 384..640 {
            assert!((out[t] - sine[t]).abs() < 1e-2, "t={t}: {} vs {}", out[t], sine[t]);
        }
    }

    #[test]
    fn test_short_signal_is_rejected() {
        let sos = butter_highpass(4, 0.5, 128.0).unwrap();
        let err = sosfiltfilt(&sos, &[1.0; 15]).unwrap_err();
        assert_eq!(err, PipelineError::SignalTooShort { len: 15, padlen: 15 });
    }

    #[test]
    fn test_highpass_inplace_touches_every_lane() {
        let mut data = Array3::<f32>::from_elem((2, 3, 256), 5.0);
        highpass_inplace(&mut data, 0.5, 128.0).unwrap();
        assert!(data.iter().all(|v| v.abs() < 1e-4));
    }
}
