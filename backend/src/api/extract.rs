//! Request body extractors.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Body parsed as JSON when the request says so, otherwise as an
/// `application/x-www-form-urlencoded` form.
#[derive(Debug)]
pub struct FormOrJson<T>(pub T);

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}

#[async_trait]
impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(&req) {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        email: String,
        password: String,
    }

    #[tokio::test]
    async fn test_parses_form() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=a%40b.com&password=pw"))
            .unwrap();

        let FormOrJson(login) = FormOrJson::<Login>::from_request(req, &()).await.unwrap();
        assert_eq!(login.email, "a@b.com");
        assert_eq!(login.password, "pw");
    }

    #[tokio::test]
    async fn test_parses_json() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
            .unwrap();

        let FormOrJson(login) = FormOrJson::<Login>::from_request(req, &()).await.unwrap();
        assert_eq!(login.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.com"}"#))
            .unwrap();

        let err = FormOrJson::<Login>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
