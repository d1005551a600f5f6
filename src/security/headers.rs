use axum::{
    extract::Request,
    http::{HeaderValue, header::HeaderName},
    middleware::Next,
    response::Response,
};

/// Pages load their bundle from `STATIC_URL`, which may live on another
/// origin, so scripts are not pinned to `'self'` alone.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; script-src 'self' https:; \
     img-src 'self' http://www.gravatar.com https://www.gravatar.com; \
     frame-ancestors 'none'; base-uri 'none'; form-action 'self'";
const REFERRER_POLICY: &str = "same-origin";
const PERMISSIONS_POLICY: &str = "geolocation=(), microphone=(), camera=()";

pub async fn set_security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    for (name, value) in [
        ("content-security-policy", CONTENT_SECURITY_POLICY),
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("referrer-policy", REFERRER_POLICY),
        ("permissions-policy", PERMISSIONS_POLICY),
        ("x-xss-protection", "0"),
    ] {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}
