use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::{debug, info};

use crate::config::S3 as S3Settings;
use crate::error::{Error, Result};
use crate::location::ObjectLocation;
use crate::payload::FilePayload;

/// One object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
	pub key: String,
	pub size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
	pub entries: Vec<ListingEntry>,
	/// The service held back further pages.
	pub truncated: bool,
}

impl Listing {
	pub fn log(&self, heading: &str) {
		info!("{}", heading);
		for entry in &self.entries {
			info!("key={} size={}", entry.key, entry.size);
		}
		if self.truncated {
			info!("listing truncated after {} entries", self.entries.len());
		}
	}
}

/// The two remote calls a run needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
	async fn list_objects(&self, bucket: &str) -> Result<Listing>;

	async fn put_object(&self, location: &ObjectLocation, payload: FilePayload) -> Result<()>;
}

pub struct S3Store {
	client: Client,
}

impl S3Store {
	pub fn new(client: Client) -> Self {
		S3Store { client }
	}

	/// Builds a client from the default AWS chain plus the `[s3]` overrides.
	pub async fn from_config(settings: &S3Settings) -> Result<Self> {
		let mut loader = aws_config::defaults(BehaviorVersion::latest());
		if let Some(region) = &settings.region {
			loader = loader.region(Region::new(region.clone()));
		}
		let shared_config = loader.load().await;

		let region = shared_config.region().ok_or_else(|| {
			Error::ConfigLoad("no AWS region found in the environment, shared config, or s3.region".to_string())
		})?;
		debug!("Using AWS region {}", region);

		let mut builder = aws_sdk_s3::config::Builder::from(&shared_config)
			.force_path_style(settings.force_path_style);
		if let Some(endpoint) = &settings.endpoint_url {
			info!("Using S3 endpoint override {}", endpoint);
			builder = builder.endpoint_url(endpoint);
		}

		Ok(S3Store::new(Client::from_conf(builder.build())))
	}
}

fn remote_error<E>(operation: &'static str, target: impl Into<String>, err: SdkError<E, HttpResponse>) -> Error
where
	E: std::error::Error + Send + Sync + 'static,
{
	Error::Remote {
		operation,
		target: target.into(),
		message: DisplayErrorContext(&err).to_string(),
	}
}

#[async_trait]
impl ObjectStore for S3Store {
	async fn list_objects(&self, bucket: &str) -> Result<Listing> {
		let output = self.client
			.list_objects()
			.bucket(bucket)
			.send()
			.await
			.map_err(|e| remote_error("ListObjects", bucket, e))?;

		let entries = output
			.contents()
			.iter()
			.map(|object| ListingEntry {
				key: object.key().unwrap_or_default().to_string(),
				size: object.size().unwrap_or_default(),
			})
			.collect();

		Ok(Listing {
			entries,
			truncated: output.is_truncated().unwrap_or(false),
		})
	}

	async fn put_object(&self, location: &ObjectLocation, payload: FilePayload) -> Result<()> {
		let size = payload.len();
		self.client
			.put_object()
			.bucket(location.bucket())
			.key(location.key())
			.body(payload.into_body())
			.send()
			.await
			.map_err(|e| remote_error("PutObject", location.to_string(), e))?;

		info!("File uploaded to S3: {} ({} bytes)", location, size);
		Ok(())
	}
}
