
use num_complex::Complex;

use super::CA_CODE_LENGTH_CHIPS;

// G2 output delays in chips for PRN 1 through 32 (IS-GPS-200, table 3-I)
const G2_DELAY_CHIPS:[usize; 32] = [
	  5,   6,   7,   8,  17,  18, 139, 140, 141, 251,
	252, 254, 255, 256, 257, 258, 469, 470, 471, 472,
	473, 474, 509, 512, 513, 514, 515, 516, 859, 860,
	861, 862 ];

/// One C/A code period for the given PRN as 0/1 chips.
///
/// The two 10-stage shift registers are held in plus/minus-one form with -1
/// standing for a set bit, which turns the XOR feedback taps into products.
pub fn ca_code_bits(prn:usize) -> Vec<u8> {
	assert!(prn >= 1 && prn <= 32, "C/A codes are defined for PRN 1 through 32");

	let mut g1 = [0i8; CA_CODE_LENGTH_CHIPS];
	let mut g2 = [0i8; CA_CODE_LENGTH_CHIPS];
	let mut r1 = [-1i8; 10];
	let mut r2 = [-1i8; 10];
	for i in 0..CA_CODE_LENGTH_CHIPS {
		g1[i] = r1[9];
		g2[i] = r2[9];
		let c1 = r1[2] * r1[9];
		let c2 = r2[1] * r2[2] * r2[5] * r2[7] * r2[8] * r2[9];
		r1.rotate_right(1);
		r2.rotate_right(1);
		r1[0] = c1;
		r2[0] = c2;
	}

	let mut chips = Vec::with_capacity(CA_CODE_LENGTH_CHIPS);
	let mut j = CA_CODE_LENGTH_CHIPS - G2_DELAY_CHIPS[prn - 1];
	for i in 0..CA_CODE_LENGTH_CHIPS {
		let v = -g1[i] * g2[j % CA_CODE_LENGTH_CHIPS];
		chips.push(if v >= 0 { 1 } else { 0 });
		j += 1;
	}
	chips
}

/// One C/A code period as plus/minus-one symbols, one element per chip
pub fn prn_int(prn:usize) -> Vec<i8> {
	ca_code_bits(prn).into_iter().map(|b| if b == 1 { -1 } else { 1 }).collect()
}

pub fn prn_complex(prn:usize) -> Vec<Complex<f64>> {
	prn_int(prn).into_iter().map(|b| Complex{ re: b as f64, im: 0.0 }).collect()
}
