
use std::f64::consts;

pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;
	fn initialize(&mut self);

}

/* Both loop filters produce an NCO correction that the tracking engine applies
as a delta against the acquisition seed, so initialize() zeroes the internal
integrators and a zero error sequence keeps the correction at exactly zero. */

/// Second-order code loop filter derived from a noise bandwidth in Hz and a
/// predetection integration time in seconds
pub struct CodeLoopFilter {
	pdi: f64,
	tau1: f64,
	tau2: f64,
	old_error: f64,
	old_nco: f64,
}

impl CodeLoopFilter {

	pub fn new(bn_hz:f64, pdi_s:f64) -> Self {
		let zeta:f64 = consts::FRAC_1_SQRT_2;
		let wn = (bn_hz * 8.0 * zeta) / (4.0 * zeta * zeta + 1.0);
		let tau1 = 1.0 / (wn * wn);
		let tau2 = (2.0 * zeta) / wn;
		Self { pdi: pdi_s, tau1, tau2, old_error: 0.0, old_nco: 0.0 }
	}

}

impl ScalarFilter for CodeLoopFilter {

	fn apply(&mut self, x:f64) -> f64 {
		let nco = self.old_nco + (self.tau2 / self.tau1) * (x - self.old_error) + x * (self.pdi / self.tau1);
		self.old_error = x;
		self.old_nco = nco;
		nco
	}

	fn initialize(&mut self) {
		self.old_error = 0.0;
		self.old_nco = 0.0;
	}

}

/// Third-order carrier loop filter (w0 = Bn/0.7845 with the standard a3/b3
/// constants), integrated with the trapezoidal rule
pub struct CarrierLoopFilter {
	pdi: f64,
	w0: f64,
	w0p2: f64,
	w0p3: f64,
	a3: f64,
	b3: f64,
	vel: f64,
	pos: f64,
}

impl CarrierLoopFilter {

	pub fn new(bn_hz:f64, pdi_s:f64) -> Self {
		let w0 = bn_hz / 0.7845;
		Self { pdi: pdi_s, w0, w0p2: w0 * w0, w0p3: w0 * w0 * w0, a3: 1.1, b3: 2.4, vel: 0.0, pos: 0.0 }
	}

}

impl ScalarFilter for CarrierLoopFilter {

	fn apply(&mut self, x:f64) -> f64 {
		let vel_prev = self.vel;
		let pos_prev = self.pos;
		self.vel = vel_prev + x * self.w0p3 * self.pdi;
		self.pos = pos_prev + self.pdi * (0.5 * (self.vel + vel_prev) + self.a3 * self.w0p2 * x);
		0.5 * (self.pos + pos_prev) + self.b3 * self.w0 * x
	}

	fn initialize(&mut self) {
		self.vel = 0.0;
		self.pos = 0.0;
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn zero_error_gives_zero_correction() {
		let mut code = CodeLoopFilter::new(2.0, 0.001);
		let mut carrier = CarrierLoopFilter::new(50.0, 0.001);
		for _ in 0..100 {
			assert_eq!(code.apply(0.0), 0.0);
			assert_eq!(carrier.apply(0.0), 0.0);
		}
	}

	#[test]
	fn constant_error_ramps_the_nco() {
		let mut code = CodeLoopFilter::new(2.0, 0.001);
		let mut last = 0.0;
		for _ in 0..50 {
			let nco = code.apply(0.1);
			assert!(nco > last);
			last = nco;
		}

		let mut carrier = CarrierLoopFilter::new(50.0, 0.001);
		let mut last = 0.0;
		for _ in 0..50 {
			let nco = carrier.apply(0.01);
			assert!(nco > last);
			last = nco;
		}
	}

	#[test]
	fn initialize_resets_the_integrators() {
		let mut code = CodeLoopFilter::new(2.0, 0.001);
		let mut carrier = CarrierLoopFilter::new(50.0, 0.001);
		for _ in 0..20 {
			code.apply(0.3);
			carrier.apply(0.05);
		}
		code.initialize();
		carrier.initialize();
		assert_eq!(code.apply(0.0), 0.0);
		assert_eq!(carrier.apply(0.0), 0.0);
	}

}
