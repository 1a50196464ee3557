//! Terminal error handler: renders the `error` view for failed requests.
//!
//! Three kinds of response end up here:
//! - `AppError` responses, which carry an `ErrorPage` extension;
//! - axum's bare `405` for a known path with another method, treated as an
//!   unmatched route;
//! - extractor rejections (`Query`, `Path`, body limits), which are plain
//!   text 4xx/5xx responses.

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::api::handlers::fallback::route_not_found;
use crate::api::SharedState;
use crate::config::Environment;
use crate::error::ErrorPage;

/// Rejection bodies are short messages; anything longer is cut off.
const MAX_REJECTION_BODY: usize = 64 * 1024;

/// Template context for the error view. Details are only exposed outside
/// production; production gets an empty `error` object.
pub fn error_context(page: &ErrorPage, environment: Environment) -> Value {
    let error = if environment.is_production() {
        json!({})
    } else {
        json!({
            "status": page.status.as_u16(),
            "detail": page.detail,
        })
    };

    json!({
        "message": page.message,
        "error": error,
    })
}

/// Error page for a plain-text rejection body.
pub fn rejection_page(status: StatusCode, body: &str) -> ErrorPage {
    let detail = body.trim().to_string();
    let message = if status.is_server_error() || detail.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        detail.clone()
    };

    ErrorPage {
        status,
        message,
        detail,
    }
}

async fn page_for(
    method: &Method,
    uri: &Uri,
    response: Response,
) -> Option<(ErrorPage, Response)> {
    if let Some(page) = response.extensions().get::<ErrorPage>().cloned() {
        return Some((page, response));
    }

    let status = response.status();
    if status == StatusCode::METHOD_NOT_ALLOWED {
        let err = route_not_found(method, uri);
        return Some((err.error_page(), err.into_response()));
    }
    if !status.is_client_error() && !status.is_server_error() {
        return None;
    }

    let (parts, body) = response.into_parts();
    let text = match to_bytes(body, MAX_REJECTION_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read rejection body");
            String::new()
        }
    };
    tracing::warn!(status = status.as_u16(), detail = %text.trim(), "Request rejected");

    let page = rejection_page(status, &text);
    Some((page, Response::from_parts(parts, Body::from(text))))
}

pub async fn render_error_page(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| request.uri().clone());

    let response = next.run(request).await;

    let Some((page, response)) = page_for(&method, &uri, response).await else {
        return response;
    };

    let context = error_context(&page, state.config.environment);
    match state.templates.render("error", &context) {
        Ok(html) => (page.status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ErrorPage {
        ErrorPage {
            status: StatusCode::NOT_FOUND,
            message: "GET /nope route not found".into(),
            detail: "Resource not found: GET /nope route not found".into(),
        }
    }

    #[test]
    fn test_development_exposes_details() {
        let ctx = error_context(&page(), Environment::Development);
        assert_eq!(ctx["message"], "GET /nope route not found");
        assert_eq!(ctx["error"]["status"], 404);
        assert!(ctx["error"]["detail"].as_str().unwrap().starts_with("Resource"));
    }

    #[test]
    fn test_production_hides_details() {
        let ctx = error_context(&page(), Environment::Production);
        assert_eq!(ctx["message"], "GET /nope route not found");
        assert_eq!(ctx["error"], json!({}));
    }

    #[test]
    fn test_client_rejection_shows_its_text() {
        let page = rejection_page(
            StatusCode::BAD_REQUEST,
            "Failed to deserialize query string: duplicate field `error`\n",
        );
        assert_eq!(page.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            page.message,
            "Failed to deserialize query string: duplicate field `error`"
        );
        assert_eq!(page.detail, page.message);
    }

    #[test]
    fn test_server_rejection_hides_its_text() {
        let page = rejection_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Missing request extension: Session",
        );
        assert_eq!(page.message, "Internal Server Error");
        assert_eq!(page.detail, "Missing request extension: Session");
    }

    #[test]
    fn test_empty_rejection_uses_reason_phrase() {
        let page = rejection_page(StatusCode::PAYLOAD_TOO_LARGE, "");
        assert_eq!(page.message, "Payload Too Large");
    }

    #[tokio::test]
    async fn test_method_not_allowed_becomes_route_not_found() {
        let response = StatusCode::METHOD_NOT_ALLOWED.into_response();
        let uri = Uri::from_static("/post");
        let (page, response) = page_for(&Method::GET, &uri, response).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(page.status, StatusCode::NOT_FOUND);
        assert_eq!(page.message, "GET /post route not found");
    }

    #[tokio::test]
    async fn test_successful_response_passes_through() {
        let response = (StatusCode::OK, "fine").into_response();
        let uri = Uri::from_static("/");
        assert!(page_for(&Method::GET, &uri, response).await.is_none());
    }
}
