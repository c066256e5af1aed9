use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{error::ServeError, AppState};

/// Header carrying the client key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Check the `X-API-Key` header against the expected key, if any.
pub fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ServeError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        Err(ServeError::Unauthorized)
    }
}

/// Middleware rejecting requests without the configured API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServeError> {
    authorize(state.api_key.as_deref(), request.headers())?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(key: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = key {
            headers.insert(API_KEY_HEADER, HeaderValue::from_static(key));
        }
        headers
    }

    #[test]
    fn disabled_auth_accepts_everything() {
        assert!(authorize(None, &headers(None)).is_ok());
        assert!(authorize(None, &headers(Some("whatever"))).is_ok());
    }

    #[test]
    fn enabled_auth_requires_exact_key() {
        assert!(authorize(Some("s3cret"), &headers(Some("s3cret"))).is_ok());
        assert!(matches!(
            authorize(Some("s3cret"), &headers(None)),
            Err(ServeError::Unauthorized)
        ));
        assert!(matches!(
            authorize(Some("s3cret"), &headers(Some("S3CRET"))),
            Err(ServeError::Unauthorized)
        ));
        assert!(matches!(
            authorize(Some("s3cret"), &headers(Some("s3cret "))),
            Err(ServeError::Unauthorized)
        ));
    }
}
