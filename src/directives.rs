//! `Cache-Control` parsing.
//!
//! Parsing never fails: malformed numbers read as absent and unknown
//! directives are kept verbatim so they survive a re-serialisation.

use std::fmt;
use std::time::Duration;

use http::header::CACHE_CONTROL;
use http::HeaderMap;

use crate::headers::parse_delta_seconds;

/// Staleness accepted by a request's `max-stale` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxStale {
    /// `max-stale` without a value: any staleness is acceptable.
    Unlimited,
    /// `max-stale=N`.
    Limit(Duration),
}

/// Parsed view of one or more `Cache-Control` header values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    entries: Vec<(String, Option<String>)>,
}

impl Directives {
    /// Parses a single `Cache-Control` value.
    pub fn parse(value: &str) -> Self {
        let mut directives = Self::default();
        directives.extend_from(value);
        directives
    }

    /// Parses every `Cache-Control` line in `headers`. Lines that are not
    /// valid UTF-8 are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut directives = Self::default();
        for value in headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
        {
            directives.extend_from(value);
        }
        directives
    }

    fn extend_from(&mut self, value: &str) {
        for part in value.split(',') {
            let (name, value) = match part.split_once('=') {
                Some((name, value)) => (name, Some(unquote(value.trim()).to_owned())),
                None => (part, None),
            };
            let name = name.trim().to_ascii_lowercase();
            // First occurrence wins.
            if name.is_empty() || self.contains(&name) {
                continue;
            }
            self.entries.push((name, value));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Returns `Some(value)` when the directive is present; the inner option
    /// is `None` for valueless directives.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_deref())
    }

    /// Reads a delta-seconds directive. Missing values and malformed numbers
    /// both read as absent.
    pub fn seconds(&self, name: &str) -> Option<Duration> {
        self.get(name).flatten().and_then(parse_delta_seconds)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    /// Returns a copy with `name` added as a valueless directive.
    pub fn with(mut self, name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if !self.contains(&name) {
            self.entries.push((name, None));
        }
        self
    }

    /// Returns a copy without any of `names`.
    pub fn without(mut self, names: &[&str]) -> Self {
        self.entries
            .retain(|(key, _)| !names.iter().any(|name| key == name));
        self
    }

    pub fn no_store(&self) -> bool {
        self.contains("no-store")
    }

    pub fn no_cache(&self) -> bool {
        self.contains("no-cache")
    }

    pub fn private(&self) -> bool {
        self.contains("private")
    }

    pub fn public(&self) -> bool {
        self.contains("public")
    }

    pub fn must_revalidate(&self) -> bool {
        self.contains("must-revalidate")
    }

    pub fn proxy_revalidate(&self) -> bool {
        self.contains("proxy-revalidate")
    }

    pub fn immutable(&self) -> bool {
        self.contains("immutable")
    }

    pub fn only_if_cached(&self) -> bool {
        self.contains("only-if-cached")
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.seconds("max-age")
    }

    pub fn s_maxage(&self) -> Option<Duration> {
        self.seconds("s-maxage")
    }

    pub fn stale_while_revalidate(&self) -> Option<Duration> {
        self.seconds("stale-while-revalidate")
    }

    pub fn stale_if_error(&self) -> Option<Duration> {
        self.seconds("stale-if-error")
    }

    pub fn min_fresh(&self) -> Option<Duration> {
        self.seconds("min-fresh")
    }

    pub fn max_stale(&self) -> Option<MaxStale> {
        match self.get("max-stale")? {
            None => Some(MaxStale::Unlimited),
            Some(value) => parse_delta_seconds(value).map(MaxStale::Limit),
        }
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(value) => write!(f, "{name}={value}")?,
                None => f.write_str(name)?,
            }
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::DELTA_SECONDS_CEILING;
    use http::HeaderValue;

    #[test]
    fn parses_flags_and_values() {
        let cc = Directives::parse(" Public, MAX-AGE=60 ,s-maxage=\"120\", no-cache");
        assert!(cc.public());
        assert!(cc.no_cache());
        assert_eq!(cc.max_age(), Some(Duration::from_secs(60)));
        assert_eq!(cc.s_maxage(), Some(Duration::from_secs(120)));
        assert!(!cc.no_store());
    }

    #[test]
    fn malformed_numbers_read_as_absent() {
        let cc = Directives::parse("max-age=abc, s-maxage=-5, stale-if-error=, max-age=10");
        assert!(cc.contains("max-age"));
        assert_eq!(cc.max_age(), None, "first occurrence wins even if malformed");
        assert_eq!(cc.s_maxage(), None);
        assert_eq!(cc.stale_if_error(), None);
    }

    #[test]
    fn oversized_delta_seconds_are_clamped() {
        let cc = Directives::parse("max-age=99999999999999999999999");
        assert_eq!(cc.max_age(), Some(Duration::from_secs(DELTA_SECONDS_CEILING)));
    }

    #[test]
    fn max_stale_without_value_is_unlimited() {
        assert_eq!(
            Directives::parse("max-stale").max_stale(),
            Some(MaxStale::Unlimited)
        );
        assert_eq!(
            Directives::parse("max-stale=30").max_stale(),
            Some(MaxStale::Limit(Duration::from_secs(30)))
        );
        assert_eq!(Directives::parse("max-stale=soon").max_stale(), None);
    }

    #[test]
    fn unknown_directives_survive_display() {
        let cc = Directives::parse("pre-check=0, post-check=0, max-age=5, x-custom");
        assert_eq!(cc.to_string(), "pre-check=0, post-check=0, max-age=5, x-custom");
        let trimmed = cc.without(&["pre-check", "post-check"]);
        assert_eq!(trimmed.to_string(), "max-age=5, x-custom");
    }

    #[test]
    fn from_headers_joins_multiple_lines() {
        let mut headers = HeaderMap::new();
        headers.append(CACHE_CONTROL, HeaderValue::from_static("private"));
        headers.append(CACHE_CONTROL, HeaderValue::from_static("max-age=3"));
        let cc = Directives::from_headers(&headers);
        assert!(cc.private());
        assert_eq!(cc.max_age(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn empty_input_has_no_directives() {
        assert!(Directives::parse("").is_empty());
        assert!(Directives::from_headers(&HeaderMap::new()).is_empty());
    }
}
