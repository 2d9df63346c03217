
use std::collections::VecDeque;
use std::f64::consts;

use log::{info, warn};
use num_complex::Complex;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;

use crate::TrackError;
use crate::block::StreamFunctionality;
use crate::filters::{ScalarFilter, CarrierLoopFilter, CodeLoopFilter};
use crate::gnss::common::{constellation_name, AcquisitionResult};
use crate::gnss::gps_l1_ca::{CA_CODE_LENGTH_CHIPS, CA_CODE_RATE_HZ, GPS_L1_FREQ_HZ,
	CN0_ESTIMATION_SAMPLES, MAXIMUM_LOCK_FAIL_COUNTER, MINIMUM_VALID_CN0_DB_HZ};
use crate::gnss::gps_l1_ca::signal_modulation;
use crate::gnss::tracking::{correlator, discriminators, lock_detectors};
use crate::io::{TrackDump, TrackDumpRecord};


/// Pushed on the control sink when the lock detector disables the channel
pub const MSG_LOSS_OF_LOCK:i32 = 3;

// Predetection integration time, one nominal PRN period
const PDI_SECONDS:f64 = 0.001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
	/// Intermediate frequency of the front end; kept for bookkeeping, the
	/// acquisition Doppler is taken as IF-inclusive
	pub if_freq_hz: f64,
	pub fs_sps: f64,
	/// Nominal PRN period in samples (fs times 1 ms)
	pub vector_length: usize,
	pub pll_bw_hz: f64,
	pub dll_bw_hz: f64,
	pub early_late_space_chips: f64,
	pub carrier_lock_threshold: f64,
	pub dump: bool,
	pub dump_filename: String,
}

impl TrackingConfig {

	/// One millisecond of samples at fs with the usual loop settings
	pub fn for_sample_rate(fs_sps:f64) -> Self {
		Self {
			if_freq_hz: 0.0,
			fs_sps,
			vector_length: (fs_sps * PDI_SECONDS).round() as usize,
			pll_bw_hz: 50.0,
			dll_bw_hz: 2.0,
			early_late_space_chips: 0.5,
			carrier_lock_threshold: 0.85,
			dump: false,
			dump_filename: "track_ch".to_string(),
		}
	}

}

/// Per-PRN-period output record consumed by the telemetry decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackReport {
	pub prn: usize,
	pub system: char,
	pub prompt_i: f64,
	pub prompt_q: f64,
	/// Stream time at the start of the correlated block, seconds
	pub tracking_timestamp_secs: f64,
	pub carrier_phase_rads: f64,
	pub code_phase_secs: f64,
	pub cn0_db_hz: f64,
	pub valid: bool,
}

impl Default for TrackReport {
	fn default() -> Self {
		Self { prn: 0, system: ' ', prompt_i: 0.0, prompt_q: 0.0, tracking_timestamp_secs: 0.0,
			carrier_phase_rads: 0.0, code_phase_secs: 0.0, cn0_db_hz: 0.0, valid: false }
	}
}

#[derive(Debug)]
pub struct StepOutput {
	pub report: TrackReport,
	/// How many input samples this step consumed; the host drains exactly
	/// this many from the front of its buffer
	pub consumed: usize,
}

#[derive(Debug, Clone)]
pub enum TrackingCommand {
	SetAcquisition(AcquisitionResult),
	StartTracking,
}

/// Serializable snapshot of the loop state for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingDebug {
	pub carrier_doppler_hz: f64,
	pub code_freq_hz: f64,
	pub code_phase_samples: f64,
	pub cn0_db_hz: f64,
	pub carrier_lock_test: f64,
	pub lock_fail_counter: usize,
}

/// DLL/PLL tracking engine for one GPS L1 C/A channel.
///
/// Construct with a configuration, bind an acquisition result, arm with
/// start_tracking, then call stream_step whenever at least 2 * vector_length
/// contiguous samples are available.  Every call emits exactly one report.
pub struct Tracking {
	// Immutable configuration
	fs: f64,
	if_freq_hz: f64,
	vector_length: usize,
	early_late_space_chips: f64,
	carrier_lock_threshold: f64,
	channel: usize,

	// External collaborators
	acq: Option<AcquisitionResult>,
	msg_sink: Option<mpsc::UnboundedSender<i32>>,
	dump: Option<TrackDump>,

	// Local replica buffers.  ca_code carries one wraparound sentinel at each
	// end so the resampler's rounded fmod indexing never needs a branch.
	ca_code: Vec<Complex<f64>>,
	early_code: Vec<Complex<f64>>,
	prompt_code: Vec<Complex<f64>>,
	late_code: Vec<Complex<f64>>,
	carr_sign: Vec<Complex<f64>>,

	carrier_filter: CarrierLoopFilter,
	code_filter: CodeLoopFilter,

	// Stream time
	sample_counter: u64,
	sample_counter_seconds: f64,

	// Acquisition seed captured at start_tracking
	acq_sample_stamp: u64,
	acq_carrier_doppler_hz: f64,
	acq_code_phase_samples: f64,

	// Loop state
	carrier_doppler_hz: f64,
	code_freq_hz: f64,
	code_phase_step_chips: f64,
	rem_code_phase_samples: f64,
	rem_carr_phase_rad: f64,
	/// Running sum of the per-block wrapped carrier residual; this is what the
	/// downstream consumer expects, not classical unwrapped phase
	acc_carrier_phase_rad: f64,
	code_phase_samples: f64,
	current_prn_length_samples: usize,
	next_prn_length_samples: usize,
	next_rem_code_phase_samples: f64,

	// State machine
	enable_tracking: bool,
	pull_in: bool,

	// Lock detection
	carrier_lock_fail_counter: usize,
	prompt_buffer: VecDeque<Complex<f64>>,
	cn0_db_hz: f64,
	carrier_lock_test: f64,
}

impl Tracking {

	pub fn new(cfg:&TrackingConfig, channel:usize) -> Result<Self, TrackError> {
		if !(cfg.fs_sps >= CA_CODE_RATE_HZ) {
			return Err(TrackError::InvalidConfiguration("sample rate must be at least the chipping rate"));
		}
		if cfg.vector_length == 0 {
			return Err(TrackError::InvalidConfiguration("vector length must be nonzero"));
		}
		if !(cfg.pll_bw_hz > 0.0 && cfg.dll_bw_hz > 0.0) {
			return Err(TrackError::InvalidConfiguration("loop bandwidths must be positive"));
		}
		if !(cfg.early_late_space_chips > 0.0 && cfg.early_late_space_chips < 1.0) {
			return Err(TrackError::InvalidConfiguration("early-late spacing must be in (0, 1) chips"));
		}

		let dump = if cfg.dump {
			let filename = format!("{}{}.dat", cfg.dump_filename, channel);
			match TrackDump::create(&filename) {
				Ok(d) => {
					info!("Tracking dump enabled on channel {}, log file {}", channel, filename);
					Some(d)
				},
				Err(e) => {
					warn!("Channel {}: unable to open tracking dump file {}: {}", channel, filename, e);
					None
				},
			}
		} else { None };

		let zero = Complex{ re: 0.0, im: 0.0 };
		let buf_len = 2 * cfg.vector_length;

		Ok(Self {
			fs: cfg.fs_sps,
			if_freq_hz: cfg.if_freq_hz,
			vector_length: cfg.vector_length,
			early_late_space_chips: cfg.early_late_space_chips,
			carrier_lock_threshold: cfg.carrier_lock_threshold,
			channel,
			acq: None,
			msg_sink: None,
			dump,
			ca_code: vec![zero; CA_CODE_LENGTH_CHIPS + 2],
			early_code: vec![zero; buf_len],
			prompt_code: vec![zero; buf_len],
			late_code: vec![zero; buf_len],
			carr_sign: vec![zero; buf_len],
			carrier_filter: CarrierLoopFilter::new(cfg.pll_bw_hz, PDI_SECONDS),
			code_filter: CodeLoopFilter::new(cfg.dll_bw_hz, PDI_SECONDS),
			sample_counter: 0,
			sample_counter_seconds: 0.0,
			acq_sample_stamp: 0,
			acq_carrier_doppler_hz: 0.0,
			acq_code_phase_samples: 0.0,
			carrier_doppler_hz: 0.0,
			code_freq_hz: CA_CODE_RATE_HZ,
			code_phase_step_chips: CA_CODE_RATE_HZ / cfg.fs_sps,
			rem_code_phase_samples: 0.0,
			rem_carr_phase_rad: 0.0,
			acc_carrier_phase_rad: 0.0,
			code_phase_samples: 0.0,
			current_prn_length_samples: cfg.vector_length,
			next_prn_length_samples: cfg.vector_length,
			next_rem_code_phase_samples: 0.0,
			enable_tracking: false,
			pull_in: false,
			carrier_lock_fail_counter: 0,
			prompt_buffer: VecDeque::with_capacity(CN0_ESTIMATION_SAMPLES),
			cn0_db_hz: 0.0,
			carrier_lock_test: 1.0,
		})
	}

	// Read-only getter methods
	pub fn enabled(&self) -> bool { self.enable_tracking }
	pub fn if_freq_hz(&self) -> f64 { self.if_freq_hz }
	pub fn carrier_doppler_hz(&self) -> f64 { self.carrier_doppler_hz }
	pub fn code_freq_hz(&self) -> f64 { self.code_freq_hz }
	pub fn code_phase_samples(&self) -> f64 { self.code_phase_samples }
	pub fn cn0_db_hz(&self) -> f64 { self.cn0_db_hz }
	pub fn carrier_lock_test(&self) -> f64 { self.carrier_lock_test }
	pub fn sample_counter(&self) -> u64 { self.sample_counter }
	pub fn sample_counter_seconds(&self) -> f64 { self.sample_counter_seconds }

	pub fn debug(&self) -> TrackingDebug {
		TrackingDebug {
			carrier_doppler_hz: self.carrier_doppler_hz,
			code_freq_hz: self.code_freq_hz,
			code_phase_samples: self.code_phase_samples,
			cn0_db_hz: self.cn0_db_hz,
			carrier_lock_test: self.carrier_lock_test,
			lock_fail_counter: self.carrier_lock_fail_counter,
		}
	}

	pub fn set_acquisition(&mut self, acq:AcquisitionResult) -> Result<(), TrackError> {
		if acq.prn < 1 || acq.prn > 32 {
			return Err(TrackError::InvalidConfiguration("PRN must be in 1..=32"));
		}
		self.acq = Some(acq);
		Ok(())
	}

	pub fn set_message_sink(&mut self, tx:mpsc::UnboundedSender<i32>) {
		self.msg_sink = Some(tx);
	}

	/// Arm the channel: correct the acquisition code phase for the delay
	/// between acquisition and now, seed the loops and schedule the pull-in.
	pub fn start_tracking(&mut self) -> Result<(), TrackError> {
		let acq = self.acq.clone().ok_or(TrackError::MissingAcquisition)?;
		if acq.sample_stamp > self.sample_counter {
			return Err(TrackError::InvalidConfiguration("acquisition sample stamp is ahead of the stream"));
		}

		self.acq_sample_stamp = acq.sample_stamp;
		self.acq_carrier_doppler_hz = acq.doppler_hz;

		let acq_trk_diff_samples = self.sample_counter - self.acq_sample_stamp;
		let acq_trk_diff_seconds = acq_trk_diff_samples as f64 / self.fs;

		// Doppler-corrected code rate and the PRN period it implies
		let radial_velocity_factor = (GPS_L1_FREQ_HZ + acq.doppler_hz) / GPS_L1_FREQ_HZ;
		self.code_freq_hz = radial_velocity_factor * CA_CODE_RATE_HZ;
		let t_prn_mod_seconds = CA_CODE_LENGTH_CHIPS as f64 / self.code_freq_hz;
		let t_prn_mod_samples = t_prn_mod_seconds * self.fs;
		self.next_prn_length_samples = t_prn_mod_samples.round() as usize;

		// Project the acquisition code phase forward over the elapsed PRN periods
		let t_prn_true_seconds = CA_CODE_LENGTH_CHIPS as f64 / CA_CODE_RATE_HZ;
		let t_prn_true_samples = t_prn_true_seconds * self.fs;
		let t_prn_diff_seconds = t_prn_true_seconds - t_prn_mod_seconds;
		let n_prn_diff = acq_trk_diff_seconds / t_prn_true_seconds;

		let mut corrected_acq_phase_samples =
			(acq.code_phase_samples + t_prn_diff_seconds * n_prn_diff * self.fs) % t_prn_true_samples;
		if corrected_acq_phase_samples < 0.0 {
			corrected_acq_phase_samples += t_prn_mod_samples;
		}
		self.acq_code_phase_samples = corrected_acq_phase_samples;

		self.carrier_doppler_hz = acq.doppler_hz;
		self.carrier_filter.initialize();
		self.code_filter.initialize();

		// Local code replica with chip 1 at index 1 and a wraparound sentinel
		// at each end
		let chips = signal_modulation::prn_complex(acq.prn);
		for (i, chip) in chips.iter().enumerate() {
			self.ca_code[i + 1] = *chip;
		}
		self.ca_code[0] = self.ca_code[CA_CODE_LENGTH_CHIPS];
		self.ca_code[CA_CODE_LENGTH_CHIPS + 1] = self.ca_code[1];

		self.carrier_lock_fail_counter = 0;
		self.rem_code_phase_samples = 0.0;
		self.rem_carr_phase_rad = 0.0;
		self.next_rem_code_phase_samples = 0.0;
		self.acc_carrier_phase_rad = 0.0;
		self.code_phase_samples = self.acq_code_phase_samples;
		self.code_phase_step_chips = self.code_freq_hz / self.fs;
		self.prompt_buffer.clear();
		self.cn0_db_hz = 0.0;
		self.carrier_lock_test = 1.0;

		info!("Tracking start on channel {} for satellite {} {}",
			self.channel, constellation_name(acq.system), acq.prn);

		self.pull_in = true;
		self.enable_tracking = true;
		Ok(())
	}

	/// One scheduler step.  While armed, `input` must hold at least the
	/// forecast window of 2 * vector_length contiguous samples.
	pub fn stream_step(&mut self, input:&[Complex<f32>]) -> StepOutput {
		if !self.enable_tracking {
			return StepOutput{ report: self.seeded_report(), consumed: 0 };
		}
		if self.pull_in {
			return self.pull_in_step();
		}
		self.run_step(input)
	}

	// Zeroed record carrying the PRN/system passthrough once bound
	fn seeded_report(&self) -> TrackReport {
		match &self.acq {
			Some(acq) => TrackReport{ prn: acq.prn, system: acq.system, ..TrackReport::default() },
			None => TrackReport::default(),
		}
	}

	/// First armed step: discard input up to the corrected acquisition code
	/// phase so the next block starts on a PRN boundary.
	fn pull_in_step(&mut self) -> StepOutput {
		let acq_to_trk_delay_samples = (self.sample_counter - self.acq_sample_stamp) as f64;
		let shift_correction =
			self.next_prn_length_samples as f64 - acq_to_trk_delay_samples % self.next_prn_length_samples as f64;
		let samples_offset = (self.acq_code_phase_samples + shift_correction).round() as usize;

		self.sample_counter += samples_offset as u64;
		self.sample_counter_seconds = self.sample_counter as f64 / self.fs;
		self.pull_in = false;

		StepOutput{ report: self.seeded_report(), consumed: samples_offset }
	}

	fn run_step(&mut self, input:&[Complex<f32>]) -> StepOutput {
		self.current_prn_length_samples = self.next_prn_length_samples;
		let n = self.current_prn_length_samples;

		self.update_local_code();
		self.update_local_carrier();

		let (early, prompt, late) = correlator::carrier_wipeoff_and_epl(
			&input[..n], &self.carr_sign[..n],
			&self.early_code[..n], &self.prompt_code[..n], &self.late_code[..n]);

		if !prompt.re.is_finite() || !prompt.im.is_finite() {
			// Swallow everything on hand so the stream can resynchronize
			let consumed = input.len();
			self.sample_counter += consumed as u64;
			self.sample_counter_seconds = self.sample_counter as f64 / self.fs;
			warn!("Channel {}: non-finite prompt correlation at sample {}", self.channel, self.sample_counter);
			let mut report = self.seeded_report();
			report.tracking_timestamp_secs = self.sample_counter_seconds;
			return StepOutput{ report, consumed };
		}

		let timestamp_secs = self.sample_counter_seconds;

		// Carrier loop
		let carr_error = discriminators::pll_two_quadrant_atan(prompt);
		let carr_nco = self.carrier_filter.apply(carr_error);
		self.carrier_doppler_hz = self.acq_carrier_doppler_hz + carr_nco;

		// Code loop
		let code_error = discriminators::dll_nc_e_minus_l_normalized(early, late);
		let code_nco = self.code_filter.apply(code_error);
		self.code_freq_hz = CA_CODE_RATE_HZ - code_nco;

		self.schedule_next_block();
		self.update_lock_detectors(prompt);

		let mut report = self.seeded_report();
		report.prompt_i = prompt.re;
		report.prompt_q = prompt.im;
		report.tracking_timestamp_secs = timestamp_secs;
		report.carrier_phase_rads = self.acc_carrier_phase_rad;
		report.code_phase_secs = self.code_phase_samples / self.fs;
		report.cn0_db_hz = self.cn0_db_hz;
		report.valid = true;

		self.write_dump_record(early, prompt, late, carr_error, carr_nco, code_error, code_nco);

		self.sample_counter += n as u64;
		self.sample_counter_seconds = self.sample_counter as f64 / self.fs;

		StepOutput{ report, consumed: n }
	}

	/// Resample the C/A replica at the current code rate into the three
	/// correlator tap buffers, honoring the sub-sample residual carried over
	/// from the previous block.
	fn update_local_code(&mut self) {
		let code_length_chips = CA_CODE_LENGTH_CHIPS as f64;
		let code_phase_step_chips = self.code_phase_step_chips;
		let rem_code_phase_chips = self.rem_code_phase_samples * (self.code_freq_hz / self.fs);
		let spc = self.early_late_space_chips;

		let mut tcode_chips = -rem_code_phase_chips;
		for i in 0..self.current_prn_length_samples {
			let early_idx = 1 + ((tcode_chips - spc) % code_length_chips).round() as isize;
			self.early_code[i] = self.ca_code[early_idx as usize];
			let prompt_idx = 1 + (tcode_chips % code_length_chips).round() as isize;
			self.prompt_code[i] = self.ca_code[prompt_idx as usize];
			let late_idx = 1 + ((tcode_chips + spc) % code_length_chips).round() as isize;
			self.late_code[i] = self.ca_code[late_idx as usize];
			tcode_chips += code_phase_step_chips;
		}
	}

	/// Regenerate the carrier replica at the current Doppler, carrying the
	/// phase residual across blocks.
	fn update_local_carrier(&mut self) {
		let phase_step_rad = 2.0 * consts::PI * self.carrier_doppler_hz / self.fs;
		let mut phase_rad = self.rem_carr_phase_rad;
		for i in 0..self.current_prn_length_samples {
			self.carr_sign[i] = Complex{ re: phase_rad.cos(), im: phase_rad.sin() };
			phase_rad += phase_step_rad;
		}
		self.rem_carr_phase_rad = phase_rad % (2.0 * consts::PI);
		self.acc_carrier_phase_rad += self.rem_carr_phase_rad;
	}

	/// Derive the next block length from the updated code frequency and carry
	/// the rounding remainder, keeping the code phase estimate current.
	fn schedule_next_block(&mut self) {
		self.code_phase_step_chips = self.code_freq_hz / self.fs;

		let t_prn_seconds = CA_CODE_LENGTH_CHIPS as f64 / self.code_freq_hz;
		let t_prn_samples = t_prn_seconds * self.fs;
		self.rem_code_phase_samples = self.next_rem_code_phase_samples;
		let k_blk_samples = t_prn_samples + self.rem_code_phase_samples;

		let t_prn_true_samples = (CA_CODE_LENGTH_CHIPS as f64 / CA_CODE_RATE_HZ) * self.fs;
		self.code_phase_samples = (self.code_phase_samples + t_prn_samples - t_prn_true_samples) % t_prn_true_samples;
		if self.code_phase_samples < 0.0 {
			self.code_phase_samples += t_prn_true_samples;
		}

		// Round to a whole sample count; the clamp keeps a diverged loop
		// inside the forecast window the host guarantees.  The remainder is
		// carried against the length actually scheduled so the next replica
		// resampling stays consistent with the block it runs over.
		let next = k_blk_samples.round();
		self.next_prn_length_samples = (next.max(1.0) as usize).min(2 * self.vector_length);
		self.next_rem_code_phase_samples = k_blk_samples - self.next_prn_length_samples as f64;
	}

	/// Collect prompt outputs; once the buffer is full, refresh the C/N0 and
	/// carrier lock estimates and run the fail counter.
	fn update_lock_detectors(&mut self, prompt:Complex<f64>) {
		if self.prompt_buffer.len() < CN0_ESTIMATION_SAMPLES {
			self.prompt_buffer.push_back(prompt);
			return;
		}

		self.cn0_db_hz = lock_detectors::cn0_snv_estimator(&self.prompt_buffer, self.fs);
		self.carrier_lock_test = lock_detectors::carrier_lock_detector(&self.prompt_buffer);
		self.prompt_buffer.clear();

		if self.carrier_lock_test < self.carrier_lock_threshold || self.cn0_db_hz < MINIMUM_VALID_CN0_DB_HZ {
			self.carrier_lock_fail_counter += 1;
		} else if self.carrier_lock_fail_counter > 0 {
			self.carrier_lock_fail_counter -= 1;
		}

		if self.carrier_lock_fail_counter > MAXIMUM_LOCK_FAIL_COUNTER {
			warn!("Channel {}: loss of lock", self.channel);
			if let Some(sink) = &self.msg_sink {
				if sink.send(MSG_LOSS_OF_LOCK).is_err() {
					warn!("Channel {}: control sink closed", self.channel);
				}
			}
			self.carrier_lock_fail_counter = 0;
			self.enable_tracking = false;
		}
	}

	fn write_dump_record(&mut self, early:Complex<f64>, prompt:Complex<f64>, late:Complex<f64>,
		carr_error:f64, carr_nco:f64, code_error:f64, code_nco:f64) {
		if let Some(dump) = self.dump.as_mut() {
			let rec = TrackDumpRecord {
				abs_early: early.norm() as f32,
				abs_prompt: prompt.norm() as f32,
				abs_late: late.norm() as f32,
				prompt_i: prompt.re as f32,
				prompt_q: prompt.im as f32,
				sample_counter: self.sample_counter,
				acc_carrier_phase_rad: self.acc_carrier_phase_rad as f32,
				carrier_doppler_hz: self.carrier_doppler_hz as f32,
				code_freq_hz: self.code_freq_hz as f32,
				carr_error: carr_error as f32,
				carr_nco: carr_nco as f32,
				code_error: code_error as f32,
				code_nco: code_nco as f32,
				cn0_db_hz: self.cn0_db_hz as f32,
				carrier_lock_test: self.carrier_lock_test as f32,
				sample_counter_seconds: self.sample_counter_seconds,
			};
			if let Err(e) = dump.write_record(&rec) {
				warn!("Channel {}: dropping tracking dump record: {}", self.channel, e);
			}
		}
	}

}

impl Drop for Tracking {
	fn drop(&mut self) {
		if let Some(dump) = self.dump.as_mut() {
			if let Err(e) = dump.flush() {
				warn!("Channel {}: error flushing tracking dump: {}", self.channel, e);
			}
		}
	}
}

impl StreamFunctionality<TrackingCommand, (), Complex<f32>, TrackReport> for Tracking {

	fn control(&mut self, control:&TrackingCommand) -> Result<(), &'static str> {
		match control {
			TrackingCommand::SetAcquisition(acq) =>
				self.set_acquisition(acq.clone()).map_err(|_| "invalid acquisition binding"),
			TrackingCommand::StartTracking =>
				self.start_tracking().map_err(|_| "unable to arm tracking"),
		}
	}

	fn forecast(&self) -> usize { 2 * self.vector_length }

	fn apply_window(&mut self, window:&[Complex<f32>]) -> (TrackReport, usize) {
		let StepOutput{ report, consumed } = self.stream_step(window);
		(report, consumed)
	}

}
