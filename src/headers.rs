//! Header helpers shared by the decision modules.
//!
//! Everything here reads headers defensively: values that are missing,
//! not valid UTF-8 or not parseable are reported as `None`.

use std::time::{Duration, SystemTime};

use http::header::{
    CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, TRANSFER_ENCODING, VARY, WARNING,
};
use http::{HeaderMap, HeaderName, HeaderValue};

/// Headers that are never copied from one hop to the next. `Date` is listed
/// because the cache regenerates it when serving.
const HOP_BY_HOP: &[&str] = &[
    "date",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Delta-seconds values too large to represent are clamped to 2^31.
pub(crate) const DELTA_SECONDS_CEILING: u64 = 1 << 31;

/// Parses delta-seconds: ASCII digits only, clamped to 2^31.
pub(crate) fn parse_delta_seconds(value: &str) -> Option<Duration> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs = value
        .parse::<u64>()
        .unwrap_or(DELTA_SECONDS_CEILING)
        .min(DELTA_SECONDS_CEILING);
    Some(Duration::from_secs(secs))
}

/// Returns the first value of `name` as trimmed text.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Parses an HTTP-date header.
pub fn header_date(headers: &HeaderMap, name: &HeaderName) -> Option<SystemTime> {
    header_str(headers, name).and_then(|value| httpdate::parse_http_date(value).ok())
}

/// Parses a delta-seconds header such as `Age`, with the same clamping as
/// `Cache-Control` values.
pub fn header_seconds(headers: &HeaderMap, name: &HeaderName) -> Option<Duration> {
    header_str(headers, name).and_then(parse_delta_seconds)
}

/// Splits a comma-separated header list across every line of `name`.
pub fn header_tokens(headers: &HeaderMap, name: &HeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The request headers a stored response varies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vary {
    /// No `Vary` header.
    None,
    /// `Vary: *`, which no later request can match.
    Any,
    /// Lower-cased field names, sorted and de-duplicated.
    Fields(Vec<HeaderName>),
}

impl Vary {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if !headers.contains_key(VARY) {
            return Vary::None;
        }
        let tokens = header_tokens(headers, &VARY);
        if tokens.iter().any(|token| token == "*") {
            return Vary::Any;
        }
        let mut fields: Vec<HeaderName> = tokens
            .iter()
            .filter_map(|token| HeaderName::from_bytes(token.as_bytes()).ok())
            .collect();
        fields.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        fields.dedup();
        Vary::Fields(fields)
    }

    /// Whether `stored` and `incoming` agree on every varied field.
    pub fn matches(&self, stored: &HeaderMap, incoming: &HeaderMap) -> bool {
        match self {
            Vary::None => true,
            Vary::Any => false,
            Vary::Fields(fields) => fields
                .iter()
                .all(|name| stored.get_all(name).iter().eq(incoming.get_all(name).iter())),
        }
    }
}

pub fn is_weak_etag(etag: &str) -> bool {
    etag.trim_start().starts_with("W/")
}

pub fn strip_weak_prefix(etag: &str) -> &str {
    let trimmed = etag.trim_start();
    trimmed.strip_prefix("W/").unwrap_or(trimmed)
}

/// Copies `headers` without hop-by-hop fields, fields listed in
/// `Connection`, and 1xx warnings.
pub fn without_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let connection_listed = header_tokens(headers, &CONNECTION);
    let mut out = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name_str = name.as_str();
        if HOP_BY_HOP.contains(&name_str)
            || connection_listed
                .iter()
                .any(|listed| listed.eq_ignore_ascii_case(name_str))
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    if out.contains_key(WARNING) {
        let kept: Vec<String> = header_tokens(&out, &WARNING)
            .into_iter()
            .filter(|warning| !is_informational_warning(warning))
            .collect();
        out.remove(WARNING);
        if !kept.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&kept.join(", ")) {
                out.insert(WARNING, value);
            }
        }
    }

    out
}

fn is_informational_warning(warning: &str) -> bool {
    let code = warning.as_bytes();
    code.len() >= 3 && code[0] == b'1' && code[1].is_ascii_digit() && code[2].is_ascii_digit()
}

/// Folds the headers of a `304 Not Modified` into the stored headers.
///
/// Returns a new map; neither input is touched. Fields present in the 304
/// replace the stored ones, except those describing the stored body.
pub fn merge_revalidated(stored: &HeaderMap, not_modified: &HeaderMap) -> HeaderMap {
    let mut merged = stored.clone();
    for name in not_modified.keys() {
        if describes_stored_body(name) {
            continue;
        }
        merged.remove(name);
        for value in not_modified.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    merged
}

/// Headers describing the stored body; a 304 never replaces them.
fn describes_stored_body(name: &HeaderName) -> bool {
    *name == CONTENT_LENGTH
        || *name == CONTENT_ENCODING
        || *name == TRANSFER_ENCODING
        || *name == CONTENT_RANGE
}

/// Formats `time` as an HTTP-date header value.
pub fn http_date_value(time: SystemTime) -> HeaderValue {
    // IMF-fixdate is plain ASCII, so this cannot fail.
    HeaderValue::from_str(&httpdate::fmt_http_date(time))
        .unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}
