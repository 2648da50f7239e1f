//! The list, upload, list-again sequence.
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::location::ObjectLocation;
use crate::payload::read_local_file;
use crate::store::{Listing, ObjectStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub location: ObjectLocation,
    pub bytes_uploaded: usize,
    pub before: Listing,
    pub after: Listing,
}

/// Runs one sequence against `store`. The first failure ends the run.
#[instrument(skip_all, fields(bucket = %config.s3.bucket))]
pub async fn run<S>(config: &Config, store: &S) -> Result<RunReport>
where
    S: ObjectStore + ?Sized,
{
    let bucket = config.s3.bucket.as_str();

    let before = store.list_objects(bucket).await?;
    before.log("first page results:");

    let location = ObjectLocation::parse(&config.upload.target_uri)?;
    let payload = read_local_file(&config.upload.file_path).await?;
    let bytes_uploaded = payload.len();
    if payload.is_empty() {
        warn!("{} is empty; uploading a zero-byte object", payload.path().display());
    }
    info!(
        "Uploading {} ({} bytes) to {}",
        payload.path().display(),
        bytes_uploaded,
        location
    );

    let deadline = config.upload_timeout();
    match timeout(deadline, store.put_object(&location, payload)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(Error::Timeout {
                location,
                after: deadline,
            })
        }
    }

    let after = store.list_objects(bucket).await?;
    after.log("first page results again after pushing files to S3:");

    Ok(RunReport {
        location,
        bytes_uploaded,
        before,
        after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::FilePayload;
    use crate::store::ListingEntry;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List(String),
        Put { bucket: String, key: String, bytes: usize },
    }

    // In-memory store that records every call it receives.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
        objects: Mutex<Vec<ListingEntry>>,
        fail_list: bool,
        fail_put: bool,
        put_delay: Option<Duration>,
    }

    impl RecordingStore {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn list_objects(&self, bucket: &str) -> Result<Listing> {
            self.calls.lock().unwrap().push(Call::List(bucket.to_string()));
            if self.fail_list {
                return Err(Error::Remote {
                    operation: "ListObjects",
                    target: bucket.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            Ok(Listing {
                entries: self.objects.lock().unwrap().clone(),
                truncated: false,
            })
        }

        async fn put_object(&self, location: &ObjectLocation, payload: FilePayload) -> Result<()> {
            self.calls.lock().unwrap().push(Call::Put {
                bucket: location.bucket().to_string(),
                key: location.key().to_string(),
                bytes: payload.len(),
            });
            if self.fail_put {
                return Err(Error::Remote {
                    operation: "PutObject",
                    target: location.to_string(),
                    message: "AccessDenied".to_string(),
                });
            }
            if let Some(delay) = self.put_delay {
                tokio::time::sleep(delay).await;
            }
            self.objects.lock().unwrap().push(ListingEntry {
                key: location.key().to_string(),
                size: payload.len() as i64,
            });
            Ok(())
        }
    }

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "meter,reading\n1,42\n").expect("Failed to write temp file");
        file
    }

    fn config_for(file_path: &str, target_uri: &str) -> Config {
        let mut config = Config::default();
        config.s3.bucket = "meter-bucket".to_string();
        config.upload.file_path = file_path.to_string();
        config.upload.target_uri = target_uri.to_string();
        config
    }

    #[tokio::test]
    async fn test_run_lists_uploads_and_lists_again() {
        let file = sample_file();
        let config = config_for(file.path().to_str().unwrap(), "s3://meter-bucket/event1/data.csv");
        let store = RecordingStore::default();

        let report = assert_ok!(run(&config, &store).await);

        assert_eq!(
            store.calls(),
            vec![
                Call::List("meter-bucket".to_string()),
                Call::Put {
                    bucket: "meter-bucket".to_string(),
                    key: "event1/data.csv".to_string(),
                    bytes: 19,
                },
                Call::List("meter-bucket".to_string()),
            ]
        );
        assert_eq!(report.bytes_uploaded, 19);
        assert!(report.before.entries.is_empty());
        assert_eq!(
            report.after.entries,
            vec![ListingEntry { key: "event1/data.csv".to_string(), size: 19 }]
        );
    }

    #[tokio::test]
    async fn test_listing_bucket_is_independent_of_target_bucket() {
        let file = sample_file();
        let config = config_for(file.path().to_str().unwrap(), "s3://other-bucket/data.csv");
        let store = RecordingStore::default();

        assert_ok!(run(&config, &store).await);

        let calls = store.calls();
        assert_eq!(calls[0], Call::List("meter-bucket".to_string()));
        assert_eq!(calls[2], Call::List("meter-bucket".to_string()));
        assert!(matches!(&calls[1], Call::Put { bucket, .. } if bucket == "other-bucket"));
    }

    #[tokio::test]
    async fn test_missing_file_stops_before_upload() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let missing = dir.path().join("02082021_test.csv");
        let config = config_for(missing.to_str().unwrap(), "s3://meter-bucket/event1/data.csv");
        let store = RecordingStore::default();

        let err = assert_err!(run(&config, &store).await);

        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(store.calls(), vec![Call::List("meter-bucket".to_string())]);
    }

    #[tokio::test]
    async fn test_invalid_uri_stops_before_upload() {
        let file = sample_file();
        let config = config_for(file.path().to_str().unwrap(), "http://meter-bucket/data.csv");
        let store = RecordingStore::default();

        let err = assert_err!(run(&config, &store).await);

        assert!(matches!(err, Error::InvalidUri { .. }));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_stops_run() {
        let file = sample_file();
        let config = config_for(file.path().to_str().unwrap(), "s3://meter-bucket/data.csv");
        let store = RecordingStore {
            fail_list: true,
            ..Default::default()
        };

        let err = assert_err!(run(&config, &store).await);

        assert!(matches!(err, Error::Remote { operation: "ListObjects", .. }));
        assert_eq!(store.calls(), vec![Call::List("meter-bucket".to_string())]);
    }

    #[tokio::test]
    async fn test_upload_failure_skips_second_listing() {
        let file = sample_file();
        let config = config_for(file.path().to_str().unwrap(), "s3://meter-bucket/data.csv");
        let store = RecordingStore {
            fail_put: true,
            ..Default::default()
        };

        let err = assert_err!(run(&config, &store).await);

        assert!(matches!(err, Error::Remote { operation: "PutObject", .. }));
        assert_eq!(store.calls().len(), 2);
        assert!(matches!(&store.calls()[1], Call::Put { key, .. } if key == "data.csv"));
    }

    #[tokio::test]
    async fn test_empty_file_is_still_uploaded() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        let config = config_for(file.path().to_str().unwrap(), "s3://meter-bucket/empty.csv");
        let store = RecordingStore::default();

        let report = assert_ok!(run(&config, &store).await);

        assert_eq!(report.bytes_uploaded, 0);
        assert_eq!(
            report.after.entries,
            vec![ListingEntry { key: "empty.csv".to_string(), size: 0 }]
        );
    }

    #[tokio::test]
    async fn test_slow_upload_times_out() {
        let file = sample_file();
        let mut config = config_for(file.path().to_str().unwrap(), "s3://meter-bucket/data.csv");
        config.upload.timeout_secs = 1;
        let store = RecordingStore {
            put_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        let err = assert_err!(run(&config, &store).await);

        match err {
            Error::Timeout { location, after } => {
                assert_eq!(location.key(), "data.csv");
                assert_eq!(after, Duration::from_secs(1));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        // No confirming listing after a failed upload.
        assert_eq!(store.calls().len(), 2);
    }
}
