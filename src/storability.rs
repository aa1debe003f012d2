//! Whether a response may be stored at all.

use http::header::{AUTHORIZATION, EXPIRES};
use http::Method;

use crate::policy::CachePolicy;

/// Statuses cacheable without explicit freshness information.
const CACHEABLE_BY_DEFAULT: &[u16] = &[200, 203, 204, 206, 300, 301, 404, 405, 410, 414, 501];

/// Why a response was refused, in the order the rules are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotStorable {
    /// The request method is not cacheable.
    Method,
    /// `no-store` on the response or the request.
    NoStore,
    /// `private` seen by a shared cache.
    Private,
    /// An authenticated request without a response directive allowing a
    /// shared cache to keep it.
    Authorization,
    /// The status is not cacheable by default and the response carries no
    /// `max-age`, `s-maxage` or `Expires`.
    Status,
}

impl CachePolicy {
    /// Returns `true` when the response may be stored.
    pub fn storable(&self) -> bool {
        self.storability().is_ok()
    }

    /// Like [`storable`](Self::storable), but reports the first rule that
    /// refused the response.
    pub fn storability(&self) -> Result<(), NotStorable> {
        let result = self.check_storable();

        if let Err(reason) = result {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %self.request.method(),
                url = %self.request.url(),
                status = self.response.status(),
                ?reason,
                "response not storable"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = reason;
        }

        result
    }

    fn check_storable(&self) -> Result<(), NotStorable> {
        let method = self.request.method();
        let method_ok = *method == Method::GET
            || *method == Method::HEAD
            || (*method == Method::POST && self.has_explicit_expiration());
        if !method_ok {
            return Err(NotStorable::Method);
        }

        if self.response_cc.no_store()
            || (!self.options.ignore_cargo_cult && self.request_cc.no_store())
        {
            return Err(NotStorable::NoStore);
        }

        if self.options.shared && self.response_cc.private() {
            return Err(NotStorable::Private);
        }

        if self.options.shared
            && self.request.headers().contains_key(AUTHORIZATION)
            && !self.allows_storing_authenticated()
        {
            return Err(NotStorable::Authorization);
        }

        let status_ok = CACHEABLE_BY_DEFAULT.contains(&self.response.status())
            || self.carries_freshness_information();
        if !status_ok {
            return Err(NotStorable::Status);
        }

        Ok(())
    }

    /// `max-age`, `s-maxage` (shared caches only) or `Expires`.
    pub(crate) fn has_explicit_expiration(&self) -> bool {
        (self.options.shared && self.response_cc.s_maxage().is_some())
            || self.response_cc.max_age().is_some()
            || self.response.headers().contains_key(EXPIRES)
    }

    /// Any freshness statement at all, whichever kind of cache reads it.
    fn carries_freshness_information(&self) -> bool {
        self.response_cc.max_age().is_some()
            || self.response_cc.s_maxage().is_some()
            || self.response.headers().contains_key(EXPIRES)
    }

    fn allows_storing_authenticated(&self) -> bool {
        let cc = &self.response_cc;
        cc.public() || cc.must_revalidate() || cc.max_age().is_some() || cc.s_maxage().is_some()
    }
}
