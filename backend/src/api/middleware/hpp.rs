//! HTTP parameter pollution protection.
//!
//! In production a repeated query parameter (`?a=1&a=2`) is collapsed to its
//! last value before routing, so handlers never see ambiguous input. The
//! `OriginalUri` extension is rewritten too, so 404 messages show the
//! collapsed query.

use axum::{
    extract::{OriginalUri, Request, State},
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};

use crate::api::SharedState;

/// Collapse repeated keys to their last value, keeping first-seen key order.
/// Returns `None` when the query has no repeated keys or cannot be parsed.
pub fn dedupe_query(query: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;

    let mut deduped: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    let mut repeated = false;
    for (key, value) in pairs {
        match deduped.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => {
                existing.1 = value;
                repeated = true;
            }
            None => deduped.push((key, value)),
        }
    }

    if !repeated {
        return None;
    }
    serde_urlencoded::to_string(&deduped).ok()
}

fn rewrite_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query: PathAndQuery = format!("{}?{}", uri.path(), query).parse().ok()?;
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}

pub async fn parameter_pollution(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.config.environment.is_production() {
        let rewritten = request
            .uri()
            .query()
            .and_then(dedupe_query)
            .and_then(|query| rewrite_query(request.uri(), &query));

        if let Some(uri) = rewritten {
            tracing::debug!(uri = %uri, "Collapsed repeated query parameters");
            if let Some(original) = request.extensions_mut().get_mut::<OriginalUri>() {
                original.0 = uri.clone();
            }
            *request.uri_mut() = uri;
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_last_value() {
        assert_eq!(
            dedupe_query("hashtag=a&page=2&hashtag=b").as_deref(),
            Some("hashtag=b&page=2")
        );
    }

    #[test]
    fn test_no_duplicates_is_untouched() {
        assert_eq!(dedupe_query("hashtag=a&page=2"), None);
    }

    #[test]
    fn test_encoding_survives() {
        assert_eq!(
            dedupe_query("q=a+b&q=%23node").as_deref(),
            Some("q=%23node")
        );
    }

    #[test]
    fn test_rewrite_query_keeps_path() {
        let uri: Uri = "/hashtag?hashtag=a&hashtag=b".parse().unwrap();
        let rewritten = rewrite_query(&uri, "hashtag=b").unwrap();
        assert_eq!(rewritten.to_string(), "/hashtag?hashtag=b");
    }
}
