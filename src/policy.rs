use http::header::{HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{Request, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::{Duration, SystemTime};

use crate::directives::Directives;
use crate::headers::{header_str, Vary};
use crate::record::{RequestRecord, ResponseRecord};

/// Tuning knobs attached to every [`CachePolicy`].
///
/// Options are plain values; the `with_*` helpers return new copies with
/// the requested change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Whether the cache is shared (proxy, CDN) rather than private to one
    /// user agent. Shared caches honor `s-maxage`, `private` and
    /// `proxy-revalidate`, and refuse authenticated responses by default.
    pub shared: bool,

    /// Fraction of the time since `Last-Modified` used as heuristic
    /// freshness, in `[0, 1]`.
    pub cache_heuristic: f64,

    /// Minimum freshness granted to responses marked `immutable`.
    pub immutable_min_time_to_live: Duration,

    /// Ignore directives servers copy from outdated examples. See
    /// [`CachePolicy::new`] for the exact list.
    pub ignore_cargo_cult: bool,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            shared: true,
            cache_heuristic: 0.1,
            immutable_min_time_to_live: Duration::from_secs(24 * 3600),
            ignore_cargo_cult: false,
        }
    }
}

impl PolicyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Sets the heuristic fraction, clamped to `[0, 1]`.
    pub fn with_cache_heuristic(mut self, heuristic: f64) -> Self {
        self.cache_heuristic = if heuristic.is_nan() {
            0.0
        } else {
            heuristic.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_immutable_min_time_to_live(mut self, ttl: Duration) -> Self {
        self.immutable_min_time_to_live = ttl;
        self
    }

    pub fn with_ignore_cargo_cult(mut self, ignore: bool) -> Self {
        self.ignore_cargo_cult = ignore;
        self
    }
}

/// Cache decisions for one request/response exchange.
///
/// A policy is a snapshot: it is never mutated after construction.
/// Revalidation produces a replacement through
/// [`CachePolicy::revalidated_policy`]. Directives are parsed once here and
/// held alongside the records.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub(crate) request: RequestRecord,
    pub(crate) response: ResponseRecord,
    pub(crate) options: PolicyOptions,
    pub(crate) request_cc: Directives,
    pub(crate) response_cc: Directives,
    pub(crate) vary: Vary,
}

impl CachePolicy {
    /// Builds a policy for an exchange.
    ///
    /// With [`PolicyOptions::ignore_cargo_cult`] set, a response carrying
    /// both `pre-check` and `post-check` has `pre-check`, `post-check`,
    /// `no-cache`, `no-store` and `must-revalidate` removed from its
    /// `Cache-Control`, and its `Expires` and `Pragma` headers dropped; a
    /// request's `no-store` is ignored as well. Without `Cache-Control`, a
    /// response `Pragma: no-cache` reads as `no-cache`.
    pub fn new(request: RequestRecord, response: ResponseRecord, options: PolicyOptions) -> Self {
        let mut response_cc = Directives::from_headers(response.headers());
        let mut response = response;

        if options.ignore_cargo_cult
            && response_cc.contains("pre-check")
            && response_cc.contains("post-check")
        {
            response_cc = response_cc.without(&[
                "pre-check",
                "post-check",
                "no-cache",
                "no-store",
                "must-revalidate",
            ]);
            response = strip_cargo_cult(response, &response_cc);
        }

        if !response.headers().contains_key(CACHE_CONTROL)
            && header_str(response.headers(), &PRAGMA)
                .is_some_and(|pragma| pragma.to_ascii_lowercase().contains("no-cache"))
        {
            response_cc = response_cc.with("no-cache");
        }

        let request_cc = Directives::from_headers(request.headers());
        let vary = Vary::from_headers(response.headers());

        Self {
            request,
            response,
            options,
            request_cc,
            response_cc,
            vary,
        }
    }

    /// Builds a policy from the heads of an `http` exchange.
    pub fn from_http<A, B>(
        request: &Request<A>,
        response: &Response<B>,
        response_time: SystemTime,
        options: PolicyOptions,
    ) -> Self {
        Self::new(
            RequestRecord::from_request(request),
            ResponseRecord::from_response(response, response_time),
            options,
        )
    }

    pub fn request(&self) -> &RequestRecord {
        &self.request
    }

    pub fn response(&self) -> &ResponseRecord {
        &self.response
    }

    pub fn options(&self) -> &PolicyOptions {
        &self.options
    }

    pub fn request_directives(&self) -> &Directives {
        &self.request_cc
    }

    pub fn response_directives(&self) -> &Directives {
        &self.response_cc
    }

    pub fn vary(&self) -> &Vary {
        &self.vary
    }

    pub fn is_shared(&self) -> bool {
        self.options.shared
    }

    /// Storage key for this exchange: `METHOD:url:` followed by the varied
    /// request headers as `name=value` pairs, sorted by name.
    ///
    /// The second `:` is always present, so a response without `Vary` keys
    /// as `GET:https://example.com/:` and `Vary: *` as
    /// `GET:https://example.com/:*`. Keys for the same URL therefore differ
    /// only after that separator.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{}:{}:", self.request.method(), self.request.url());
        if let Vary::Fields(fields) = &self.vary {
            for (idx, name) in fields.iter().enumerate() {
                if idx > 0 {
                    key.push(',');
                }
                let values: Vec<&str> = self
                    .request
                    .headers()
                    .get_all(name)
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .collect();
                let _ = write!(key, "{}={}", name, values.join(","));
            }
        } else if self.vary == Vary::Any {
            key.push('*');
        }
        key
    }
}

fn strip_cargo_cult(response: ResponseRecord, cc: &Directives) -> ResponseRecord {
    let mut headers = response.headers().clone();
    headers.remove(EXPIRES);
    headers.remove(PRAGMA);
    headers.remove(CACHE_CONTROL);
    if !cc.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&cc.to_string()) {
            headers.insert(CACHE_CONTROL, value);
        }
    }
    ResponseRecord::new(response.status(), headers, response.response_time())
        .with_request_time_opt(response.request_time())
}
