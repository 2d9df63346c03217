
use num_complex::Complex;

/// Carrier wipeoff and Early/Prompt/Late accumulation over one PRN block.
///
/// Each input sample is multiplied by the conjugate of the carrier replica and
/// the result is correlated against the three code replicas.  All four replica
/// slices must cover `input.len()` samples.
pub fn carrier_wipeoff_and_epl(input:&[Complex<f32>], carrier:&[Complex<f64>],
	early:&[Complex<f64>], prompt:&[Complex<f64>], late:&[Complex<f64>])
	-> (Complex<f64>, Complex<f64>, Complex<f64>) {

	let mut sum_early  = Complex{ re: 0.0, im: 0.0 };
	let mut sum_prompt = Complex{ re: 0.0, im: 0.0 };
	let mut sum_late   = Complex{ re: 0.0, im: 0.0 };
	for i in 0..input.len() {
		let bb = Complex{ re: input[i].re as f64, im: input[i].im as f64 } * carrier[i].conj();
		sum_early  += bb * early[i];
		sum_prompt += bb * prompt[i];
		sum_late   += bb * late[i];
	}
	(sum_early, sum_prompt, sum_late)
}

#[cfg(test)]
mod tests {

	use super::*;

	fn c64(re:f64, im:f64) -> Complex<f64> { Complex{ re, im } }

	#[test]
	fn accumulates_against_each_replica() {
		let input = vec![Complex{ re: 1.0f32, im: 0.0 }, Complex{ re: 0.0, im: 1.0 }, Complex{ re: -1.0, im: 0.0 }];
		let carrier = vec![c64(1.0, 0.0); 3];
		let early  = vec![c64(1.0, 0.0), c64(1.0, 0.0), c64(1.0, 0.0)];
		let prompt = vec![c64(1.0, 0.0), c64(-1.0, 0.0), c64(1.0, 0.0)];
		let late   = vec![c64(-1.0, 0.0), c64(-1.0, 0.0), c64(-1.0, 0.0)];

		let (e, p, l) = carrier_wipeoff_and_epl(&input, &carrier, &early, &prompt, &late);
		assert_eq!(e, c64(0.0, 1.0));
		assert_eq!(p, c64(-2.0, -1.0));
		assert_eq!(l, c64(0.0, -1.0));
	}

	#[test]
	fn carrier_phase_is_conjugated_away() {
		// A pure carrier multiplied by the conjugate of itself accumulates on the real axis
		let n = 100;
		let step = 0.013;
		let input:Vec<Complex<f32>> = (0..n).map(|i| {
			let phase = step * i as f64;
			Complex{ re: phase.cos() as f32, im: phase.sin() as f32 }
		}).collect();
		let carrier:Vec<Complex<f64>> = (0..n).map(|i| {
			let phase = step * i as f64;
			Complex{ re: phase.cos(), im: phase.sin() }
		}).collect();
		let code = vec![c64(1.0, 0.0); n];

		let (_, p, _) = carrier_wipeoff_and_epl(&input, &carrier, &code, &code, &code);
		assert!((p.re - n as f64).abs() < 1.0e-3);
		assert!(p.im.abs() < 1.0e-3);
	}

	#[test]
	fn nan_input_poisons_the_prompt() {
		let input = vec![Complex{ re: f32::NAN, im: 0.0 }, Complex{ re: 1.0, im: 0.0 }];
		let ones = vec![c64(1.0, 0.0); 2];
		let (_, p, _) = carrier_wipeoff_and_epl(&input, &ones, &ones, &ones, &ones);
		assert!(p.re.is_nan());
	}

}
