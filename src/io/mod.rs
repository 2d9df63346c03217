
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use byteorder::{LittleEndian, NativeEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex;

/// Streams interleaved little-endian i16 I/Q pairs from a file as complex samples
pub struct IqFileSource {
	reader: BufReader<File>,
}

impl IqFileSource {

	pub fn open(filename:&str) -> io::Result<Self> {
		Ok(Self { reader: BufReader::new(File::open(filename)?) })
	}

}

impl Iterator for IqFileSource {
	type Item = Complex<f32>;

	fn next(&mut self) -> Option<Complex<f32>> {
		match (self.reader.read_i16::<LittleEndian>(), self.reader.read_i16::<LittleEndian>()) {
			(Ok(re), Ok(im)) => Some(Complex{ re: re as f32, im: im as f32 }),
			(_, _) => None,
		}
	}
}

/// One tracking dump record per correlated PRN block
#[derive(Debug, Clone, Default)]
pub struct TrackDumpRecord {
	pub abs_early: f32,
	pub abs_prompt: f32,
	pub abs_late: f32,
	pub prompt_i: f32,
	pub prompt_q: f32,
	pub sample_counter: u64,
	pub acc_carrier_phase_rad: f32,
	pub carrier_doppler_hz: f32,
	pub code_freq_hz: f32,
	pub carr_error: f32,
	pub carr_nco: f32,
	pub code_error: f32,
	pub code_nco: f32,
	pub cn0_db_hz: f32,
	pub carrier_lock_test: f32,
	pub sample_counter_seconds: f64,
}

pub const DUMP_RECORD_BYTES:usize = 76;

/// Append-only binary dump sink, fixed record layout in host byte order
pub struct TrackDump {
	writer: BufWriter<File>,
}

impl TrackDump {

	pub fn create(filename:&str) -> io::Result<Self> {
		Ok(Self { writer: BufWriter::new(File::create(filename)?) })
	}

	pub fn write_record(&mut self, rec:&TrackDumpRecord) -> io::Result<()> {
		self.writer.write_f32::<NativeEndian>(rec.abs_early)?;
		self.writer.write_f32::<NativeEndian>(rec.abs_prompt)?;
		self.writer.write_f32::<NativeEndian>(rec.abs_late)?;
		self.writer.write_f32::<NativeEndian>(rec.prompt_i)?;
		self.writer.write_f32::<NativeEndian>(rec.prompt_q)?;
		self.writer.write_u64::<NativeEndian>(rec.sample_counter)?;
		self.writer.write_f32::<NativeEndian>(rec.acc_carrier_phase_rad)?;
		self.writer.write_f32::<NativeEndian>(rec.carrier_doppler_hz)?;
		self.writer.write_f32::<NativeEndian>(rec.code_freq_hz)?;
		self.writer.write_f32::<NativeEndian>(rec.carr_error)?;
		self.writer.write_f32::<NativeEndian>(rec.carr_nco)?;
		self.writer.write_f32::<NativeEndian>(rec.code_error)?;
		self.writer.write_f32::<NativeEndian>(rec.code_nco)?;
		self.writer.write_f32::<NativeEndian>(rec.cn0_db_hz)?;
		self.writer.write_f32::<NativeEndian>(rec.carrier_lock_test)?;
		self.writer.write_f32::<NativeEndian>(0.0)?;	// aux
		self.writer.write_f64::<NativeEndian>(rec.sample_counter_seconds)?;
		Ok(())
	}

	pub fn flush(&mut self) -> io::Result<()> {
		self.writer.flush()
	}

}
