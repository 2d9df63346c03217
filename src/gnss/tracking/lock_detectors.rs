
use std::collections::VecDeque;

use num_complex::Complex;

/// Signal-to-noise-variance C/N0 estimate in dB-Hz over a buffer of prompt
/// correlator outputs, each coherently integrated over one 1023-chip period
/// at fs samples per second
pub fn cn0_snv_estimator(prompt_buffer:&VecDeque<Complex<f64>>, fs:f64) -> f64 {
	let n:f64 = prompt_buffer.len() as f64;
	let p_sig:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.norm()).sum();
		(sum / n).powi(2)
	};
	let p_tot:f64 = {
		let sum:f64 = prompt_buffer.iter().map(|c| c.norm_sqr()).sum();
		sum / n
	};
	// A dispersion-free buffer would divide by a rounding-noise denominator
	let noise = p_tot - p_sig;
	if noise > 0.0 {
		10.0 * (p_sig / noise * fs / 1023.0).log10()
	} else if p_sig > 0.0 {
		f64::INFINITY
	} else {
		0.0
	}
}

/// Narrowband-difference over narrowband-power carrier lock test.  Close to
/// one when the prompt energy sits on the in-phase axis, close to zero when
/// the carrier is unlocked.
pub fn carrier_lock_detector(prompt_buffer:&VecDeque<Complex<f64>>) -> f64 {
	let sum_i:f64 = prompt_buffer.iter().map(|c| c.re).sum();
	let sum_q:f64 = prompt_buffer.iter().map(|c| c.im).sum();
	let nbp:f64 = sum_i * sum_i + sum_q * sum_q;
	let nbd:f64 = sum_i * sum_i - sum_q * sum_q;
	if nbp == 0.0 { 0.0 } else { nbd / nbp }
}
