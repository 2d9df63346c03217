
pub mod correlator;
pub mod discriminators;
pub mod lock_detectors;
