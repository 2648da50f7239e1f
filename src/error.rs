//! Error types shared by every step of a run.
use std::path::PathBuf;
use std::time::Duration;

use crate::location::ObjectLocation;

/// Why an `s3://` URI was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
	#[error("{0}")]
	Syntax(String),

	#[error("expected scheme to be s3, found '{0}'")]
	Scheme(String),

	#[error("expected host to be bucket name")]
	MissingBucket,

	#[error("path is empty")]
	MissingKey,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Configuration could not be loaded or is unusable.
	#[error("failed to load configuration: {0}")]
	ConfigLoad(String),

	#[error("invalid URI '{uri}' for S3 content: {reason}")]
	InvalidUri { uri: String, reason: UriError },

	#[error("error reading file from path '{}': {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The SDK call failed: transport, auth, or a service error.
	#[error("{operation} on '{target}' failed: {message}")]
	Remote {
		operation: &'static str,
		target: String,
		message: String,
	},

	#[error("upload to '{location}' timed out after {}s", after.as_secs())]
	Timeout {
		location: ObjectLocation,
		after: Duration,
	},
}

impl From<figment::Error> for Error {
	fn from(err: figment::Error) -> Self {
		Error::ConfigLoad(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
