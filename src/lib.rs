//! HTTP Cache Policy
//! =================
//!
//! `http-cache-policy` answers the questions every HTTP cache has to ask
//! about a request/response pair, following RFC 7234:
//!
//! - may this response be stored?
//! - can a stored response answer a new request without the origin?
//! - how old and how fresh is it right now?
//! - which conditional headers revalidate it, and what does the answer mean?
//!
//! The crate performs no I/O. Transport and storage stay with the caller;
//! [`CachePolicy::to_record`] and the [`PolicyCodec`] implementations are the
//! only handoff to storage. Every time-dependent call takes the current
//! instant explicitly.
//!
//! ```
//! use std::time::{Duration, SystemTime};
//! use http::{HeaderMap, HeaderValue, header::CACHE_CONTROL};
//! use http_cache_policy::prelude::*;
//!
//! let received = SystemTime::now();
//! let mut headers = HeaderMap::new();
//! headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
//!
//! let request = RequestRecord::get("https://example.com/");
//! let response = ResponseRecord::new(200, headers, received);
//! let policy = CachePolicy::new(request.clone(), response, PolicyOptions::default());
//!
//! assert!(policy.storable());
//! assert!(policy.satisfies_without_revalidation(&request, received + Duration::from_secs(30)));
//! assert!(!policy.satisfies_without_revalidation(&request, received + Duration::from_secs(90)));
//! ```
//!
//! ## Status
//! The public API is not yet stabilized.

pub mod age;
pub mod codec;
pub mod directives;
pub mod error;
pub mod headers;
pub mod policy;
pub mod prelude;
pub mod record;
pub mod revalidation;
pub mod satisfaction;
pub mod storability;

pub use codec::{BincodeCodec, JsonCodec, PolicyCodec, PolicyRecord};
pub use directives::{Directives, MaxStale};
pub use error::{PolicyError, PolicyMisuseError};
pub use policy::{CachePolicy, PolicyOptions};
pub use record::{RequestRecord, ResponseRecord};
pub use revalidation::Revalidated;
pub use storability::NotStorable;
