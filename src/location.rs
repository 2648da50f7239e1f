//! `s3://bucket/key` addressing.
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, UriError};

/// Bucket and key of a single object, parsed from an `s3://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    /// Parses `uri`, checking scheme, bucket and key in that order.
    pub fn parse(uri: &str) -> Result<Self, Error> {
        Self::validate(uri).map_err(|reason| Error::InvalidUri {
            uri: uri.to_string(),
            reason,
        })
    }

    fn validate(uri: &str) -> Result<Self, UriError> {
        // The URL parser strips tabs and newlines instead of failing.
        if uri.chars().any(char::is_control) {
            return Err(UriError::Syntax("control character in URI".to_string()));
        }

        let parsed = Url::parse(uri).map_err(|e| UriError::Syntax(e.to_string()))?;

        if parsed.scheme() != "s3" {
            return Err(UriError::Scheme(parsed.scheme().to_string()));
        }

        let bucket = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(UriError::MissingBucket),
        };
        if let Some(port) = parsed.port() {
            return Err(UriError::Syntax(format!("unexpected port {} after bucket name", port)));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(UriError::Syntax("unexpected credentials before bucket name".to_string()));
        }

        let key = urlencoding::decode(raw_path(uri).strip_prefix('/').unwrap_or_default())
            .map_err(|e| UriError::Syntax(e.to_string()))?;
        if key.is_empty() {
            return Err(UriError::MissingKey);
        }
        if key.chars().any(char::is_control) {
            return Err(UriError::Syntax("control character in key".to_string()));
        }

        Ok(ObjectLocation {
            bucket,
            key: key.into_owned(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Path of `uri` exactly as written: after the authority, before any query or
/// fragment. Dot segments are not resolved.
fn raw_path(uri: &str) -> &str {
    let rest = match uri.split_once("://") {
        Some((_, rest)) => rest,
        None => return "",
    };
    let rest = match rest.find(['?', '#']) {
        Some(end) => &rest[..end],
        None => rest,
    };
    match rest.find('/') {
        Some(start) => &rest[start..],
        None => "",
    }
}

impl FromStr for ObjectLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
