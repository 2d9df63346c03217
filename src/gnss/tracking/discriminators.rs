
use std::f64::consts;

use num_complex::Complex;

/// Two-quadrant arctangent carrier phase discriminator (Costas style, blind to
/// data-bit sign flips).  Returns the phase error in cycles.
pub fn pll_two_quadrant_atan(prompt:Complex<f64>) -> f64 {
	if prompt.re == 0.0 {
		// A quarter cycle is the largest error this discriminator can express
		if prompt.im == 0.0 { 0.0 } else { 0.25 * prompt.im.signum() }
	} else {
		(prompt.im / prompt.re).atan() / (2.0 * consts::PI)
	}
}

/// Normalized noncoherent early-minus-late envelope code discriminator
pub fn dll_nc_e_minus_l_normalized(early:Complex<f64>, late:Complex<f64>) -> f64 {
	let e = early.norm();
	let l = late.norm();
	if e + l == 0.0 { 0.0 } else { (e - l) / (e + l) }
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn atan_discriminator_in_cycles() {
		let eighth = pll_two_quadrant_atan(Complex{ re: 1.0, im: 1.0 });
		assert!((eighth - 0.125).abs() < 1.0e-12);

		// Two-quadrant: a data-bit sign flip does not change the error
		let flipped = pll_two_quadrant_atan(Complex{ re: -1.0, im: -1.0 });
		assert!((flipped - 0.125).abs() < 1.0e-12);

		assert_eq!(pll_two_quadrant_atan(Complex{ re: 1.0, im: 0.0 }), 0.0);
	}

	#[test]
	fn atan_discriminator_degenerate_prompts() {
		assert_eq!(pll_two_quadrant_atan(Complex{ re: 0.0, im: 3.0 }), 0.25);
		assert_eq!(pll_two_quadrant_atan(Complex{ re: 0.0, im: -3.0 }), -0.25);
		assert_eq!(pll_two_quadrant_atan(Complex{ re: 0.0, im: 0.0 }), 0.0);
	}

	#[test]
	fn code_discriminator_balance() {
		let e = Complex{ re: 2.0, im: 0.0 };
		let l = Complex{ re: 0.0, im: 1.0 };
		assert!((dll_nc_e_minus_l_normalized(e, l) - (1.0 / 3.0)).abs() < 1.0e-12);

		let even = Complex{ re: 0.6, im: 0.8 };
		assert_eq!(dll_nc_e_minus_l_normalized(even, even), 0.0);

		let zero = Complex{ re: 0.0, im: 0.0 };
		assert_eq!(dll_nc_e_minus_l_normalized(zero, zero), 0.0);
	}

}
