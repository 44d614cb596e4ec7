use axum::http::HeaderValue;
use axum::response::Response;

const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";

/// Attach baseline security headers to every response. Used with
/// `axum::middleware::map_response`.
pub async fn set_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static(NOSNIFF));
    headers.insert("X-Frame-Options", HeaderValue::from_static(DENY));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static(HSTS_VALUE),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(CSP_API_VALUE),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static(REFERRER_POLICY_VALUE),
    );
    response
}
