//! Request and response snapshots the policy is built from.

use std::time::SystemTime;

use http::{HeaderMap, Method, Request, Response};

/// The request half of a cached exchange.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    method: Method,
    url: String,
    headers: HeaderMap,
}

impl RequestRecord {
    /// Creates a record, normalizing the method to upper case.
    pub fn new(method: Method, url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method: normalize_method(method),
            url: url.into(),
            headers,
        }
    }

    /// Shorthand for a `GET` without headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, HeaderMap::new())
    }

    /// Snapshots the head of an `http::Request`.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().to_string(),
            request.headers().clone(),
        )
    }

    /// Returns a copy carrying `headers` instead.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// The response half of a cached exchange, with the instants needed for age
/// arithmetic.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    status: u16,
    headers: HeaderMap,
    response_time: SystemTime,
    request_time: Option<SystemTime>,
}

impl ResponseRecord {
    /// Creates a record received at `response_time`.
    pub fn new(status: u16, headers: HeaderMap, response_time: SystemTime) -> Self {
        Self {
            status,
            headers,
            response_time,
            request_time: None,
        }
    }

    /// Snapshots the head of an `http::Response`.
    pub fn from_response<B>(response: &Response<B>, response_time: SystemTime) -> Self {
        Self::new(
            response.status().as_u16(),
            response.headers().clone(),
            response_time,
        )
    }

    /// Records when the request that produced this response was sent, so the
    /// time spent in flight counts toward the response's age.
    pub fn with_request_time(mut self, request_time: SystemTime) -> Self {
        self.request_time = Some(request_time);
        self
    }

    pub(crate) fn with_request_time_opt(mut self, request_time: Option<SystemTime>) -> Self {
        self.request_time = request_time;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn response_time(&self) -> SystemTime {
        self.response_time
    }

    pub fn request_time(&self) -> Option<SystemTime> {
        self.request_time
    }
}

fn normalize_method(method: Method) -> Method {
    let raw = method.as_str();
    if raw.bytes().any(|b| b.is_ascii_lowercase()) {
        Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).unwrap_or(method)
    } else {
        method
    }
}
