
pub mod signal_modulation;
pub mod tracking;

pub const GPS_L1_FREQ_HZ:f64 = 1.57542e9;
pub const CA_CODE_RATE_HZ:f64 = 1.023e6;
pub const CA_CODE_LENGTH_CHIPS:usize = 1023;

// Lock detection parameters
pub const CN0_ESTIMATION_SAMPLES:usize = 10;
pub const MINIMUM_VALID_CN0_DB_HZ:f64 = 25.0;
pub const MAXIMUM_LOCK_FAIL_COUNTER:usize = 200;
