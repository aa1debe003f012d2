//! Reusing a stored response for a new request.

use std::time::{Duration, SystemTime};

use http::header::{AGE, DATE, HOST, PRAGMA, WARNING};
use http::{HeaderMap, HeaderValue, Method};

use crate::directives::{Directives, MaxStale};
use crate::headers::{header_str, http_date_value, without_hop_by_hop};
use crate::policy::CachePolicy;
use crate::record::RequestRecord;

const ONE_DAY: Duration = Duration::from_secs(24 * 3600);

const HEURISTIC_EXPIRATION_WARNING: &str = "113 - \"rfc7234 5.5.4\"";

impl CachePolicy {
    /// Whether the stored response can answer `request` at `now` without
    /// contacting the origin.
    ///
    /// Stale responses are only reused when the request's `max-stale`
    /// allows it and the response carries neither `must-revalidate` nor,
    /// in shared caches, `proxy-revalidate`. `stale-while-revalidate` is
    /// deliberately not folded in here; see
    /// [`can_serve_stale_while_revalidate`](Self::can_serve_stale_while_revalidate).
    pub fn satisfies_without_revalidation(&self, request: &RequestRecord, now: SystemTime) -> bool {
        if !self.storable() || !self.request_matches(request, false) {
            return false;
        }

        let request_cc = Directives::from_headers(request.headers());
        if request_forbids_cached(&request_cc, request.headers()) || self.response_cc.no_cache() {
            return false;
        }

        let age = self.current_age(now);
        if let Some(max_age) = request_cc.max_age() {
            if age > max_age {
                return false;
            }
        }

        if let Some(min_fresh) = request_cc.min_fresh() {
            if self.remaining_freshness(now) < min_fresh {
                return false;
            }
        }

        if self.is_stale(now) {
            if self.forbids_stale() {
                return false;
            }
            let staleness = age.saturating_sub(self.freshness_lifetime());
            let allowed = match request_cc.max_stale() {
                Some(MaxStale::Unlimited) => true,
                Some(MaxStale::Limit(limit)) => staleness <= limit,
                None => false,
            };
            if !allowed {
                return false;
            }
        }

        true
    }

    /// Whether a stale response may be served while the caller refreshes it
    /// in the background.
    ///
    /// Holds only for stale responses inside their `stale-while-revalidate`
    /// window that are otherwise reusable for `request`. Callers that act on
    /// it must start a revalidation.
    pub fn can_serve_stale_while_revalidate(&self, request: &RequestRecord, now: SystemTime) -> bool {
        let Some(window) = self.response_cc.stale_while_revalidate() else {
            return false;
        };
        if !self.request_matches(request, false) || !self.is_stale(now) {
            return false;
        }
        if self.forbids_stale() || self.response_cc.no_cache() {
            return false;
        }
        let request_cc = Directives::from_headers(request.headers());
        if request_forbids_cached(&request_cc, request.headers()) {
            return false;
        }
        self.current_age(now) <= self.freshness_lifetime().saturating_add(window)
    }

    /// Whether the response is still inside its `stale-if-error` window, so
    /// it may stand in for an origin error.
    pub fn can_serve_stale_if_error(&self, now: SystemTime) -> bool {
        let window = self.response_cc.stale_if_error().unwrap_or_default();
        self.current_age(now) < self.freshness_lifetime().saturating_add(window)
    }

    /// Same URL, same `Host`, same method (or `HEAD` for a stored `GET` when
    /// `allow_head` is set), and equal values for every field in `Vary`.
    pub(crate) fn request_matches(&self, request: &RequestRecord, allow_head: bool) -> bool {
        let stored = &self.request;
        let method_ok = stored.method() == request.method()
            || (allow_head && *request.method() == Method::HEAD && *stored.method() == Method::GET);

        method_ok
            && stored.url() == request.url()
            && stored.headers().get(HOST) == request.headers().get(HOST)
            && self.vary.matches(stored.headers(), request.headers())
    }

    fn forbids_stale(&self) -> bool {
        self.response_cc.must_revalidate()
            || (self.options.shared && self.response_cc.proxy_revalidate())
    }

    /// Headers to send when serving the stored response at `now`.
    ///
    /// Hop-by-hop fields and 1xx warnings are dropped, `Age` and `Date` are
    /// regenerated, and a heuristic-expiration warning is added once a
    /// heuristically fresh response is more than a day old.
    pub fn response_headers(&self, now: SystemTime) -> HeaderMap {
        let mut headers = without_hop_by_hop(self.response.headers());
        let age = self.current_age(now);

        if age > ONE_DAY && self.is_heuristic() && self.freshness_lifetime() > ONE_DAY {
            let warning = match header_str(&headers, &WARNING) {
                Some(existing) => format!("{existing}, {HEURISTIC_EXPIRATION_WARNING}"),
                None => HEURISTIC_EXPIRATION_WARNING.to_owned(),
            };
            if let Ok(value) = HeaderValue::from_str(&warning) {
                headers.insert(WARNING, value);
            }
        }

        let age_secs = age.as_secs().saturating_add(u64::from(age.subsec_millis() >= 500));
        headers.insert(AGE, HeaderValue::from(age_secs));
        headers.insert(DATE, http_date_value(now));
        headers
    }
}

fn request_forbids_cached(request_cc: &Directives, headers: &HeaderMap) -> bool {
    request_cc.no_cache()
        || header_str(headers, &PRAGMA)
            .is_some_and(|pragma| pragma.to_ascii_lowercase().contains("no-cache"))
}
