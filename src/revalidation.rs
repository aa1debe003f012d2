//! Conditional requests and folding their answers back into a policy.

use http::header::{
    ACCEPT_RANGES, DATE, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE, LAST_MODIFIED,
};
use http::{HeaderMap, HeaderValue, Method};

use crate::error::{PolicyError, PolicyMisuseError};
use crate::headers::{
    header_str, is_weak_etag, merge_revalidated, strip_weak_prefix, without_hop_by_hop,
};
use crate::policy::CachePolicy;
use crate::record::{RequestRecord, ResponseRecord};

/// Origin statuses that may be papered over by `stale-if-error`.
const ERROR_STATUSES: &[u16] = &[500, 502, 503, 504];

/// Outcome of [`CachePolicy::revalidated_policy`].
#[derive(Debug, Clone)]
pub struct Revalidated {
    /// The policy to store from now on.
    pub policy: CachePolicy,
    /// `true` when the origin sent a new representation; the caller must
    /// replace the stored body.
    pub modified: bool,
    /// `true` when the origin confirmed the stored representation.
    pub matches: bool,
}

impl CachePolicy {
    /// Headers for a conditional request revalidating this response on
    /// behalf of `request`.
    ///
    /// Starts from the request's own headers without hop-by-hop fields or
    /// `If-Range`. Validators are only added when `request` matches the
    /// stored one (a `HEAD` may revalidate a stored `GET`) and the response
    /// is storable; otherwise any conditional headers are removed.
    pub fn revalidation_headers(&self, request: &RequestRecord) -> HeaderMap {
        let mut headers = without_hop_by_hop(request.headers());
        headers.remove(IF_RANGE);

        if !self.request_matches(request, true) || !self.storable() {
            headers.remove(IF_NONE_MATCH);
            headers.remove(IF_MODIFIED_SINCE);
            return headers;
        }

        let stored = self.response.headers();
        let etag = header_str(stored, &ETAG);
        if let Some(etag) = etag {
            let value = match header_str(&headers, &IF_NONE_MATCH) {
                Some(existing) => format!("{existing}, {etag}"),
                None => etag.to_owned(),
            };
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(IF_NONE_MATCH, value);
            }
        }

        let forbids_weak_validators = headers.contains_key(ACCEPT_RANGES)
            || headers.contains_key(IF_MATCH)
            || headers.contains_key(IF_UNMODIFIED_SINCE)
            || *self.request.method() != Method::GET;

        if forbids_weak_validators {
            headers.remove(IF_MODIFIED_SINCE);
            if let Some(existing) = header_str(&headers, &IF_NONE_MATCH) {
                let strong: Vec<&str> = existing
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty() && !is_weak_etag(tag))
                    .collect();
                let strong = strong.join(", ");
                headers.remove(IF_NONE_MATCH);
                if !strong.is_empty() {
                    if let Ok(value) = HeaderValue::from_str(&strong) {
                        headers.insert(IF_NONE_MATCH, value);
                    }
                }
            }
        } else if !headers.contains_key(IF_MODIFIED_SINCE) {
            let since = stored
                .get(LAST_MODIFIED)
                .or_else(|| etag.is_none().then(|| stored.get(DATE)).flatten());
            if let Some(since) = since {
                headers.insert(IF_MODIFIED_SINCE, since.clone());
            }
        }

        headers
    }

    /// Folds the answer to a revalidation request into a replacement policy.
    ///
    /// `request` must be the request the revalidation was made for: same URL
    /// and method (a `HEAD` may stand in for a stored `GET`). Anything else
    /// is a [`PolicyMisuseError::RequestMismatch`].
    ///
    /// A 5xx answer inside the stored response's `stale-if-error` window
    /// keeps the current policy. A `304` always yields the stored response
    /// with refreshed headers and timestamps; `matches` reports whether its
    /// validators agreed with the stored ones. Any other status starts over
    /// from the new exchange.
    pub fn revalidated_policy(
        &self,
        request: RequestRecord,
        response: ResponseRecord,
    ) -> Result<Revalidated, PolicyError> {
        self.ensure_same_resource(&request)?;

        if ERROR_STATUSES.contains(&response.status())
            && self.can_serve_stale_if_error(response.response_time())
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                url = %request.url(),
                status = response.status(),
                "origin error inside stale-if-error window; keeping stored response"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!("http_cache_policy.revalidation.stale_if_error").increment(1);

            return Ok(Revalidated {
                policy: self.clone(),
                modified: false,
                matches: false,
            });
        }

        if response.status() != 304 {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                url = %request.url(),
                status = response.status(),
                "origin sent a new response"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!("http_cache_policy.revalidation.modified").increment(1);

            return Ok(Revalidated {
                policy: CachePolicy::new(request, response, self.options),
                modified: true,
                matches: false,
            });
        }

        let matches = self.validators_match(&response);
        let headers = merge_revalidated(self.response.headers(), response.headers());
        let refreshed = ResponseRecord::new(self.response.status(), headers, response.response_time())
            .with_request_time_opt(response.request_time());
        // A HEAD revalidation must not turn the stored GET into a HEAD.
        let request = RequestRecord::new(
            self.request.method().clone(),
            request.url(),
            request.headers().clone(),
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(url = %request.url(), matches, "stored response revalidated");
        #[cfg(feature = "metrics")]
        metrics::counter!("http_cache_policy.revalidation.not_modified").increment(1);

        Ok(Revalidated {
            policy: CachePolicy::new(request, refreshed, self.options),
            modified: false,
            matches,
        })
    }

    fn ensure_same_resource(&self, request: &RequestRecord) -> Result<(), PolicyMisuseError> {
        let stored = &self.request;
        let method_ok = stored.method() == request.method()
            || (*request.method() == Method::HEAD && *stored.method() == Method::GET);
        if method_ok && stored.url() == request.url() {
            return Ok(());
        }
        Err(PolicyMisuseError::RequestMismatch {
            expected: format!("{} {}", stored.method(), stored.url()),
            actual: format!("{} {}", request.method(), request.url()),
        })
    }

    fn validators_match(&self, response: &ResponseRecord) -> bool {
        if response.status() != 304 {
            return false;
        }

        let stored = self.response.headers();
        let stored_etag = header_str(stored, &ETAG);
        let new_etag = header_str(response.headers(), &ETAG);
        let stored_modified = header_str(stored, &LAST_MODIFIED);
        let new_modified = header_str(response.headers(), &LAST_MODIFIED);

        match (stored_etag, new_etag) {
            (stored_etag, Some(new_etag)) if !is_weak_etag(new_etag) => {
                stored_etag.is_some_and(|tag| strip_weak_prefix(tag) == new_etag)
            }
            (Some(stored_etag), Some(new_etag)) => {
                strip_weak_prefix(stored_etag) == strip_weak_prefix(new_etag)
            }
            _ if stored_modified.is_some() => stored_modified == new_modified,
            (None, None) => new_modified.is_none(),
            _ => false,
        }
    }
}
