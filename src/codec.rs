use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::error::{PolicyError, PolicyMisuseError};
use crate::policy::{CachePolicy, PolicyOptions};
use crate::record::{RequestRecord, ResponseRecord};

/// Version written into every [`PolicyRecord`].
pub const RECORD_VERSION: u8 = 1;

/// Plain, serializable form of a [`CachePolicy`], handed to the storage
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub version: u8,
    pub request: StoredRequest,
    pub response: StoredResponse,
    #[serde(default)]
    pub options: PolicyOptions,
}

/// Request half of a [`PolicyRecord`].
///
/// `method` and `url` are required but typed as `Option` so that a record
/// decoded from a self-describing format with missing keys is reported as
/// [`PolicyMisuseError::MissingField`] instead of a codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, Vec<u8>)>,
}

/// Response half of a [`PolicyRecord`]. `status` and `response_time` are
/// required and optional for the same reason as in [`StoredRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: Vec<(String, Vec<u8>)>,
    #[serde(default)]
    pub response_time: Option<SystemTime>,
    #[serde(default)]
    pub request_time: Option<SystemTime>,
}

impl CachePolicy {
    /// Captures everything needed to rebuild this policy.
    pub fn to_record(&self) -> PolicyRecord {
        PolicyRecord {
            version: RECORD_VERSION,
            request: StoredRequest {
                method: Some(self.request.method().as_str().to_owned()),
                url: Some(self.request.url().to_owned()),
                headers: headers_to_pairs(self.request.headers()),
            },
            response: StoredResponse {
                status: Some(self.response.status()),
                headers: headers_to_pairs(self.response.headers()),
                response_time: Some(self.response.response_time()),
                request_time: self.response.request_time(),
            },
            options: self.options,
        }
    }

    /// Rebuilds a policy from a record produced by
    /// [`to_record`](Self::to_record).
    pub fn from_record(record: PolicyRecord) -> Result<Self, PolicyMisuseError> {
        let result = Self::try_from_record(record);

        if let Err(err) = &result {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "rejected policy record");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }

        result
    }

    fn try_from_record(record: PolicyRecord) -> Result<Self, PolicyMisuseError> {
        if record.version != RECORD_VERSION {
            return Err(PolicyMisuseError::UnsupportedVersion(record.version));
        }

        let heuristic = record.options.cache_heuristic;
        if !(0.0..=1.0).contains(&heuristic) {
            return Err(PolicyMisuseError::InvalidHeuristic(heuristic.to_string()));
        }

        let method = record
            .request
            .method
            .filter(|method| !method.is_empty())
            .ok_or(PolicyMisuseError::MissingField("request.method"))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| PolicyMisuseError::MissingField("request.method"))?;
        let url = record
            .request
            .url
            .ok_or(PolicyMisuseError::MissingField("request.url"))?;
        let status = record
            .response
            .status
            .ok_or(PolicyMisuseError::MissingField("response.status"))?;
        if !(100..=999).contains(&status) {
            return Err(PolicyMisuseError::InvalidStatus(status));
        }
        let response_time = record
            .response
            .response_time
            .ok_or(PolicyMisuseError::MissingField("response.response_time"))?;

        let request = RequestRecord::new(method, url, pairs_to_headers(record.request.headers)?);
        let response = ResponseRecord::new(
            status,
            pairs_to_headers(record.response.headers)?,
            response_time,
        )
        .with_request_time_opt(record.response.request_time);

        Ok(CachePolicy::new(request, response, record.options))
    }

    /// Encodes the policy with `codec`.
    pub fn encode<C: PolicyCodec>(&self, codec: &C) -> Result<Vec<u8>, PolicyError> {
        codec.encode(&self.to_record())
    }

    /// Decodes and rebuilds a policy with `codec`.
    pub fn decode<C: PolicyCodec>(codec: &C, bytes: &[u8]) -> Result<Self, PolicyError> {
        let record = codec.decode(bytes)?;
        Ok(Self::from_record(record)?)
    }
}

fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, Vec<u8>)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
        .collect()
}

fn pairs_to_headers(pairs: Vec<(String, Vec<u8>)>) -> Result<HeaderMap, PolicyMisuseError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| PolicyMisuseError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_bytes(&value).map_err(|_| PolicyMisuseError::InvalidHeader(name))?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// Turns a [`PolicyRecord`] into the bytes a storage backend keeps, and back.
///
/// Failures in either direction are [`PolicyError::Codec`]; validating the
/// decoded record is left to [`CachePolicy::from_record`].
pub trait PolicyCodec: Send + Sync + Clone + 'static {
    fn encode(&self, record: &PolicyRecord) -> Result<Vec<u8>, PolicyError>;
    fn decode(&self, bytes: &[u8]) -> Result<PolicyRecord, PolicyError>;
}

/// Default [`PolicyCodec`] implementation backed by `bincode`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl PolicyCodec for BincodeCodec {
    fn encode(&self, record: &PolicyRecord) -> Result<Vec<u8>, PolicyError> {
        bincode::serialize(record).map_err(|err| PolicyError::Codec(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<PolicyRecord, PolicyError> {
        bincode::deserialize(bytes).map_err(|err| PolicyError::Codec(err.to_string()))
    }
}

/// Human-readable [`PolicyCodec`] backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl PolicyCodec for JsonCodec {
    fn encode(&self, record: &PolicyRecord) -> Result<Vec<u8>, PolicyError> {
        serde_json::to_vec(record).map_err(|err| PolicyError::Codec(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<PolicyRecord, PolicyError> {
        serde_json::from_slice(bytes).map_err(|err| PolicyError::Codec(err.to_string()))
    }
}
