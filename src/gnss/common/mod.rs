
use serde::{Serialize, Deserialize};

// Constellation tags as they appear on acquisition records
const SYSTEM_NAMES:[(char, &str); 5] = [
	('G', "GPS"),
	('R', "GLONASS"),
	('S', "SBAS"),
	('E', "Galileo"),
	('C', "Compass"),
];

pub fn constellation_name(tag:char) -> &'static str {
	SYSTEM_NAMES.iter().find(|(t, _)| *t == tag).map(|(_, name)| *name).unwrap_or("Unknown")
}

/// Snapshot of an acquisition handed over to tracking.  The tracker keeps its
/// own copy of these fields; nothing aliases back into the acquisition stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionResult {
	pub prn: usize,
	pub system: char,
	pub doppler_hz: f64,
	/// Code phase at the acquisition sample stamp, in samples
	pub code_phase_samples: f64,
	/// Absolute sample index at which the acquisition was observed
	pub sample_stamp: u64,
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn constellation_lookup() {
		assert_eq!(constellation_name('G'), "GPS");
		assert_eq!(constellation_name('E'), "Galileo");
		assert_eq!(constellation_name('X'), "Unknown");
	}

}
