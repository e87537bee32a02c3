use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware::Next,
    response::Response,
};

/// Treat every POST body as JSON; the host does not always set the header.
pub async fn normalize_content_type(mut request: Request, next: Next) -> Response {
    if request.method() == Method::POST {
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    next.run(request).await
}
