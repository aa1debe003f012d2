//! Age and freshness arithmetic.
//!
//! All instants are passed in explicitly; nothing here reads the clock.

use std::time::{Duration, SystemTime};

use http::header::{AGE, DATE, EXPIRES, LAST_MODIFIED, SET_COOKIE};

use crate::headers::{header_date, header_seconds, Vary};
use crate::policy::CachePolicy;

/// Statuses that may be given heuristic freshness.
const HEURISTIC_STATUSES: &[u16] = &[200, 203, 206, 300, 301, 410];

/// Elapsed time from `earlier` to `later`, or zero if `later` comes first.
pub(crate) fn elapsed(earlier: SystemTime, later: SystemTime) -> Duration {
    later.duration_since(earlier).unwrap_or(Duration::ZERO)
}

impl CachePolicy {
    /// The origin's `Date`, or the receipt time when it is missing or
    /// malformed.
    pub fn date(&self) -> SystemTime {
        header_date(self.response.headers(), &DATE).unwrap_or(self.response.response_time())
    }

    /// How old the response already looked when it arrived, judged by the
    /// origin's `Date`.
    pub fn apparent_age(&self) -> Duration {
        header_date(self.response.headers(), &DATE)
            .map(|date| elapsed(date, self.response.response_time()))
            .unwrap_or(Duration::ZERO)
    }

    /// Time the request spent in flight; zero when the send time is unknown.
    pub fn response_delay(&self) -> Duration {
        self.response
            .request_time()
            .map(|sent| elapsed(sent, self.response.response_time()))
            .unwrap_or(Duration::ZERO)
    }

    /// The `Age` header plus the response delay.
    pub fn corrected_age(&self) -> Duration {
        header_seconds(self.response.headers(), &AGE)
            .unwrap_or(Duration::ZERO)
            .saturating_add(self.response_delay())
    }

    /// Age of the response at `now`.
    pub fn current_age(&self, now: SystemTime) -> Duration {
        let initial = self.apparent_age().max(self.corrected_age());
        initial.saturating_add(elapsed(self.response.response_time(), now))
    }

    /// How long the response stays fresh after it was generated.
    ///
    /// Zero for anything that must not be reused without revalidation:
    /// non-storable responses, `no-cache`, `Vary: *`, and cookie-setting
    /// responses in shared caches unless they are `public` or `immutable`. Otherwise the
    /// first available of `s-maxage` (shared caches), `max-age`,
    /// `Expires - Date`, or the `Last-Modified` heuristic. `immutable`
    /// raises the result to at least the configured floor.
    pub fn freshness_lifetime(&self) -> Duration {
        let cc = &self.response_cc;
        if !self.storable() || cc.no_cache() || self.vary == Vary::Any {
            return Duration::ZERO;
        }

        if self.options.shared
            && self.response.headers().contains_key(SET_COOKIE)
            && !cc.public()
            && !cc.immutable()
        {
            return Duration::ZERO;
        }

        let lifetime = self.explicit_lifetime().unwrap_or_else(|| self.heuristic_lifetime());
        if cc.immutable() {
            lifetime.max(self.options.immutable_min_time_to_live)
        } else {
            lifetime
        }
    }

    fn explicit_lifetime(&self) -> Option<Duration> {
        let cc = &self.response_cc;
        if self.options.shared {
            if let Some(s_maxage) = cc.s_maxage() {
                return Some(s_maxage);
            }
        }
        if let Some(max_age) = cc.max_age() {
            return Some(max_age);
        }
        if self.response.headers().contains_key(EXPIRES) {
            // A malformed Expires means "already expired".
            let lifetime = header_date(self.response.headers(), &EXPIRES)
                .map(|expires| elapsed(self.date(), expires))
                .unwrap_or(Duration::ZERO);
            return Some(lifetime);
        }
        None
    }

    fn heuristic_lifetime(&self) -> Duration {
        if !HEURISTIC_STATUSES.contains(&self.response.status()) {
            return Duration::ZERO;
        }
        let Some(last_modified) = header_date(self.response.headers(), &LAST_MODIFIED) else {
            return Duration::ZERO;
        };
        let since_modified = elapsed(last_modified, self.response.response_time());
        let factor = self.options.cache_heuristic;
        if factor.is_nan() {
            return Duration::ZERO;
        }
        since_modified.mul_f64(factor.clamp(0.0, 1.0))
    }

    /// Whether freshness was inferred rather than stated by the origin.
    pub(crate) fn is_heuristic(&self) -> bool {
        !self.has_explicit_expiration()
    }

    /// Fresh means strictly younger than the freshness lifetime.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        self.current_age(now) < self.freshness_lifetime()
    }

    pub fn is_stale(&self, now: SystemTime) -> bool {
        !self.is_fresh(now)
    }

    /// Remaining freshness at `now`, zero once stale.
    pub fn remaining_freshness(&self, now: SystemTime) -> Duration {
        self.freshness_lifetime().saturating_sub(self.current_age(now))
    }

    /// How long a storage backend should keep the entry: the longest of the
    /// remaining freshness and the `stale-if-error` and
    /// `stale-while-revalidate` windows.
    pub fn time_to_live(&self, now: SystemTime) -> Duration {
        let age = self.current_age(now);
        let lifetime = self.freshness_lifetime();
        let stale_if_error = self.response_cc.stale_if_error().unwrap_or_default();
        let stale_while_revalidate = self.response_cc.stale_while_revalidate().unwrap_or_default();
        let extended = lifetime.saturating_add(stale_if_error.max(stale_while_revalidate));
        extended.saturating_sub(age)
    }
}
