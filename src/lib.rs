
pub mod block;

pub mod filters;
pub mod gnss;
pub mod io;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TrackError {
	InvalidConfiguration(&'static str),
	MissingAcquisition,
}
