//! Rate limit response headers
//!
//! Admitted requests report the per-minute budget; rejected ones also say
//! how long to wait before retrying.

use actix_web::{
    http::header::{HeaderMap, HeaderName, HeaderValue},
    HttpResponseBuilder,
};

use crate::gate::Denial;

/// Rate limit headers
pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const RETRY_AFTER: &str = "Retry-After";

/// Add budget headers to an admitted response
pub fn add_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(remaining),
    );
}

/// Headers for a 429 response
pub fn insert_denied_headers(builder: &mut HttpResponseBuilder, denial: &Denial) {
    // whole seconds, rounded up, never zero
    let retry_after = denial.retry_after.as_millis().div_ceil(1000).max(1);

    builder
        .insert_header((RATE_LIMIT_LIMIT, denial.limit.to_string()))
        .insert_header((RATE_LIMIT_REMAINING, "0"))
        .insert_header((RETRY_AFTER, retry_after.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::rate_limit::LimitWindow;
    use actix_web::{http::StatusCode, HttpResponse};
    use std::time::Duration;

    #[test]
    fn test_admitted_headers() {
        let mut resp = HttpResponse::Ok().finish();
        add_rate_limit_headers(resp.headers_mut(), 60, 59);
        assert_eq!(resp.headers().get(RATE_LIMIT_LIMIT).unwrap(), "60");
        assert_eq!(resp.headers().get(RATE_LIMIT_REMAINING).unwrap(), "59");
    }

    #[test]
    fn test_retry_after_never_zero() {
        let mut builder = HttpResponseBuilder::new(StatusCode::TOO_MANY_REQUESTS);
        insert_denied_headers(
            &mut builder,
            &Denial {
                window: LimitWindow::Hour,
                limit: 1000,
                retry_after: Duration::ZERO,
            },
        );
        let resp = builder.finish();
        assert_eq!(resp.headers().get(RETRY_AFTER).unwrap(), "1");
        assert_eq!(resp.headers().get(RATE_LIMIT_LIMIT).unwrap(), "1000");
    }
}
