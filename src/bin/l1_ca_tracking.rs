
use std::collections::VecDeque;

use clap::{App, Arg};
use colored::*;
use num_complex::Complex;

use gnss_track::gnss::common::AcquisitionResult;
use gnss_track::gnss::gps_l1_ca::tracking::{TrackReport, Tracking, TrackingConfig};
use gnss_track::io::IqFileSource;

fn main() {

	env_logger::init();

	let matches = App::new("GPS L1 CA DLL/PLL Tracking")
		.version("0.1.0")
		.about("Takes IQ samples centered on 1575.42 MHz and tracks a single L1 CA signal from an acquisition handover")
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Input filename (interleaved little-endian i16 IQ)")
			.required(true).takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("prn")
			.short("p").long("prn")
			.takes_value(true).required(true))
		.arg(Arg::with_name("acq_doppler_hz")
			.short("d").long("acq_doppler_hz")
			.takes_value(true).required(true))
		.arg(Arg::with_name("acq_delay_samples")
			.short("c").long("acq_delay_samples")
			.takes_value(true).required(true))
		.arg(Arg::with_name("pll_bw_hz")
			.long("pll_bw_hz").takes_value(true))
		.arg(Arg::with_name("dll_bw_hz")
			.long("dll_bw_hz").takes_value(true))
		.arg(Arg::with_name("dump")
			.long("dump")
			.help("Write per-block binary tracking records next to the input"))
		.arg(Arg::with_name("max_records")
			.short("m").long("max_records")
			.takes_value(true))
		.get_matches();

	// Parse mandatory fields
	let fname:&str = matches.value_of("filename").unwrap();
	let fs:f64 = matches.value_of("sample_rate_sps").unwrap().parse().unwrap();
	let prn:usize = matches.value_of("prn").unwrap().parse().unwrap();
	let acq_doppler_hz:f64 = matches.value_of("acq_doppler_hz").unwrap().parse().unwrap();
	let acq_delay_samples:f64 = matches.value_of("acq_delay_samples").unwrap().parse().unwrap();

	// Parse optional fields
	let opt_max_records:Option<usize> = matches.value_of("max_records").map(|s| s.parse().unwrap());

	let mut cfg = TrackingConfig::for_sample_rate(fs);
	if let Some(bw) = matches.value_of("pll_bw_hz") { cfg.pll_bw_hz = bw.parse().unwrap(); }
	if let Some(bw) = matches.value_of("dll_bw_hz") { cfg.dll_bw_hz = bw.parse().unwrap(); }
	if matches.is_present("dump") {
		cfg.dump = true;
		cfg.dump_filename = format!("{}.track_ch", fname);
	}

	eprintln!("Tracking PRN {} in {} at {} [samples/sec], max_records={:?}", prn, fname, fs, opt_max_records);

	let mut trk = Tracking::new(&cfg, 0).unwrap();
	trk.set_acquisition(AcquisitionResult{
		prn,
		system: 'G',
		doppler_hz: acq_doppler_hz,
		code_phase_samples: acq_delay_samples,
		sample_stamp: 0,
	}).unwrap();
	trk.start_tracking().unwrap();

	let mut src = IqFileSource::open(fname).unwrap();
	let window = 2 * cfg.vector_length;
	let mut buffer:VecDeque<Complex<f32>> = VecDeque::new();
	let mut reports:Vec<TrackReport> = vec![];
	let mut last_seg:u64 = 0;

	'stream: loop {
		while buffer.len() < window {
			match src.next() {
				Some(s) => buffer.push_back(s),
				None => break 'stream,
			}
		}

		let out = {
			let win = buffer.make_contiguous();
			trk.stream_step(win)
		};
		buffer.drain(..out.consumed);
		reports.push(out.report);

		if out.consumed == 0 {
			// The channel disabled itself; nothing more to do with this file
			eprintln!("{}", "Channel disabled (loss of lock)".red());
			break 'stream;
		}

		// Once-per-second status line
		let seg = trk.sample_counter() / fs as u64;
		if seg != last_seg {
			last_seg = seg;
			let d = trk.debug();
			let status = format!("t={:4} [s] doppler {:9.2} [Hz], code phase {:9.2} [samples], CN0 {:5.1} [dB-Hz]",
				seg, d.carrier_doppler_hz, d.code_phase_samples, d.cn0_db_hz);
			if d.cn0_db_hz >= 25.0 {
				eprintln!("{}", status.green());
			} else {
				eprintln!("{}", status.yellow());
			}
		}

		if let Some(max_records) = opt_max_records {
			if reports.len() >= max_records { break 'stream; }
		}
	}

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&reports).unwrap());

}
