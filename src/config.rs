//! Configuration for the application
use std::path::Path;
use std::time::Duration;

use figment::{Figment, providers::{Env, Format, Serialized, Toml}};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "Config.toml";
pub const ENV_PREFIX: &str = "S3DROP_";

// Structs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
	pub general: General,
	pub s3: S3,
	pub upload: Upload,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct General {
	pub log_level: String,
	pub log_directory: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct S3 {
	/// Bucket listed before and after the upload.
	pub bucket: String,
	pub region: Option<String>,
	/// Alternate endpoint, e.g. a local S3-compatible service.
	pub endpoint_url: Option<String>,
	pub force_path_style: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Upload {
	pub file_path: String,
	pub target_uri: String,
	pub timeout_secs: u64,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			general: General {
				log_level: "info".to_string(),
				log_directory: "logs".to_string(),
			},
			s3: S3 {
				bucket: "eratos-meter-service-test".to_string(),
				region: None,
				endpoint_url: None,
				force_path_style: false,
			},
			upload: Upload {
				file_path: "02082021_test.csv".to_string(),
				target_uri: "s3://eratos-meter-service-test/event1/02082021_test.csv".to_string(),
				timeout_secs: 60,
			},
		}
	}
}

impl Config {
	/// Defaults, then `Config.toml`, then `S3DROP_*` environment variables.
	pub fn load() -> Result<Self> {
		Self::load_from(CONFIG_FILE)
	}

	pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
		let config: Config = Figment::from(Serialized::defaults(Config::default()))
			.merge(Toml::file(path.as_ref()))
			.merge(Env::prefixed(ENV_PREFIX).split("__"))
			.extract()?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<()> {
		if self.upload.timeout_secs == 0 {
			return Err(Error::ConfigLoad("upload.timeout_secs must be greater than zero".to_string()));
		}
		if self.s3.bucket.is_empty() {
			return Err(Error::ConfigLoad("s3.bucket must not be empty".to_string()));
		}
		Ok(())
	}

	pub fn upload_timeout(&self) -> Duration {
		Duration::from_secs(self.upload.timeout_secs)
	}
}
