use std::time::{Duration, SystemTime};

use http::header::{CACHE_CONTROL, CONTENT_LENGTH, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use http_cache_policy::prelude::*;

const DAY: u64 = 24 * 3600;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(*name, HeaderValue::from_str(value).expect("valid header value"));
    }
    map
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn get(url: &str, pairs: &[(&'static str, &str)]) -> RequestRecord {
    RequestRecord::new(Method::GET, url, headers(pairs))
}

#[test]
fn never_stores_no_store_responses() {
    let variants = [
        "no-store",
        "public, no-store",
        "max-age=3600, no-store",
        "s-maxage=60, immutable, no-store",
        "no-store, must-revalidate, stale-while-revalidate=30",
    ];
    for shared in [true, false] {
        for cc in variants {
            for status in [200, 203, 301, 404] {
                let policy = CachePolicy::new(
                    get("https://example.com/", &[]),
                    ResponseRecord::new(status, headers(&[("cache-control", cc)]), at(0)),
                    PolicyOptions::default().with_shared(shared),
                );
                assert!(!policy.storable(), "{cc} / {status} / shared={shared}");
            }
        }
    }
}

#[test]
fn max_age_with_age_header_goes_stale_on_time() {
    let received = at(10_000);
    let policy = CachePolicy::new(
        get("https://example.com/a", &[]),
        ResponseRecord::new(
            200,
            headers(&[("cache-control", "max-age=100"), ("age", "50")]),
            received,
        ),
        PolicyOptions::default(),
    );
    let request = get("https://example.com/a", &[]);

    assert_eq!(policy.current_age(received), Duration::from_secs(50));
    assert!(policy.satisfies_without_revalidation(&request, received));

    let later = received + Duration::from_secs(51);
    assert_eq!(policy.current_age(later), Duration::from_secs(101));
    assert!(policy.is_stale(later));
    assert!(!policy.satisfies_without_revalidation(&request, later));
}

#[test]
fn vary_mismatch_blocks_reuse_of_fresh_response() {
    let policy = CachePolicy::new(
        get("https://example.com/v", &[("accept-encoding", "gzip")]),
        ResponseRecord::new(
            200,
            headers(&[("cache-control", "max-age=600"), ("vary", "Accept-Encoding")]),
            at(0),
        ),
        PolicyOptions::default(),
    );

    assert!(policy.is_fresh(at(1)));
    assert!(!policy.satisfies_without_revalidation(
        &get("https://example.com/v", &[("accept-encoding", "br")]),
        at(1)
    ));
    assert!(policy.satisfies_without_revalidation(
        &get("https://example.com/v", &[("accept-encoding", "gzip")]),
        at(1)
    ));
}

#[test]
fn not_modified_keeps_original_content_length() {
    let policy = CachePolicy::new(
        get("https://example.com/doc", &[]),
        ResponseRecord::new(
            200,
            headers(&[
                ("cache-control", "max-age=60"),
                ("etag", "\"v1\""),
                ("content-length", "5120"),
            ]),
            at(0),
        ),
        PolicyOptions::default(),
    );

    let request = get("https://example.com/doc", &[]);
    assert!(!policy.satisfies_without_revalidation(&request, at(120)));

    let conditional = policy.revalidation_headers(&request);
    assert_eq!(conditional.get(IF_NONE_MATCH).unwrap(), "\"v1\"");
    assert!(conditional.get(IF_MODIFIED_SINCE).is_none());

    let not_modified = ResponseRecord::new(
        304,
        headers(&[("etag", "\"v2\""), ("cache-control", "max-age=60")]),
        at(120),
    );
    let revalidated = policy
        .revalidated_policy(request.clone(), not_modified)
        .expect("same resource");

    assert!(!revalidated.modified);
    let merged = revalidated.policy.response().headers();
    assert_eq!(merged.get(ETAG).unwrap(), "\"v2\"");
    assert_eq!(merged.get(CONTENT_LENGTH).unwrap(), "5120");
    assert!(revalidated
        .policy
        .satisfies_without_revalidation(&request, at(150)));
    // The original policy is untouched.
    assert_eq!(policy.response().headers().get(ETAG).unwrap(), "\"v1\"");
}

#[test]
fn heuristic_freshness_from_last_modified() {
    let received = 400 * DAY;
    let last_modified = httpdate::fmt_http_date(at(received - 10 * DAY));
    let policy = CachePolicy::new(
        get("https://example.com/h", &[]),
        ResponseRecord::new(200, headers(&[("last-modified", last_modified.as_str())]), at(received)),
        PolicyOptions::default().with_cache_heuristic(0.1),
    );
    let request = get("https://example.com/h", &[]);

    let lifetime = policy.freshness_lifetime().as_secs_f64();
    assert!((lifetime - DAY as f64).abs() < 1.0, "{lifetime}");
    assert!(policy.satisfies_without_revalidation(&request, at(received)));
    assert!(!policy.satisfies_without_revalidation(&request, at(received + 2 * DAY)));
}

#[test]
fn full_lifecycle_from_http_types() {
    init_tracing();
    let request = Request::builder()
        .method(Method::GET)
        .uri("https://example.com/lifecycle")
        .body(())
        .unwrap();
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CACHE_CONTROL, "max-age=10, stale-while-revalidate=20")
        .header(ETAG, "\"one\"")
        .body(())
        .unwrap();

    let received = at(5_000);
    let policy = CachePolicy::from_http(&request, &response, received, PolicyOptions::default());
    let incoming = RequestRecord::from_request(&request);

    assert!(policy.storable());
    assert!(policy.satisfies_without_revalidation(&incoming, at(5_005)));

    let stale_at = at(5_015);
    assert!(!policy.satisfies_without_revalidation(&incoming, stale_at));
    assert!(policy.can_serve_stale_while_revalidate(&incoming, stale_at));

    let modified = ResponseRecord::new(
        200,
        headers(&[("cache-control", "max-age=10"), ("etag", "\"two\"")]),
        stale_at,
    );
    let next = policy
        .revalidated_policy(incoming.clone(), modified)
        .expect("same resource");
    assert!(next.modified);
    assert_eq!(next.policy.response().headers().get(ETAG).unwrap(), "\"two\"");
    assert!(next.policy.satisfies_without_revalidation(&incoming, at(5_020)));
}

#[test]
fn shared_and_private_caches_disagree_on_private_responses() {
    init_tracing();
    let response = || {
        ResponseRecord::new(
            200,
            headers(&[("cache-control", "private, max-age=60")]),
            at(0),
        )
    };
    let shared = CachePolicy::new(get("/p", &[]), response(), PolicyOptions::default());
    let browser = CachePolicy::new(
        get("/p", &[]),
        response(),
        PolicyOptions::default().with_shared(false),
    );

    assert_eq!(shared.storability(), Err(NotStorable::Private));
    assert!(browser.storable());
    assert!(browser.satisfies_without_revalidation(&get("/p", &[]), at(30)));
}

#[test]
fn revalidating_a_different_resource_is_misuse() {
    init_tracing();
    let policy = CachePolicy::new(
        get("https://example.com/one", &[]),
        ResponseRecord::new(200, HeaderMap::new(), at(0)),
        PolicyOptions::default(),
    );
    let err = policy
        .revalidated_policy(
            RequestRecord::new(Method::POST, "https://example.com/one", HeaderMap::new()),
            ResponseRecord::new(304, HeaderMap::new(), at(1)),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Misuse(PolicyMisuseError::RequestMismatch { .. })
    ));
}
