use axum::http::{HeaderMap, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Per-request metadata made available to handlers through request extensions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: Option<String>,
}

/// First address in `x-forwarded-for`, if any.
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    let context = RequestContext {
        request_id: request_id.clone(),
        client_ip: client_ip_from_headers(req.headers()),
    };
    req.extensions_mut().insert(context);

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(
            client_ip_from_headers(&headers).as_deref(),
            Some("203.0.113.7")
        );
    }

    #[test]
    fn client_ip_absent_without_header() {
        assert!(client_ip_from_headers(&HeaderMap::new()).is_none());
    }
}
