use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// Request body deserialized from JSON and checked with `validator`.
///
/// Rejections render through [`AppError`] like every other handler error:
/// an unreadable body is 400 with the offending part named, a body that
/// parses but breaks a field rule is 422 with per-field details.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(body_error)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn body_error(rejection: JsonRejection) -> AppError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Request body must be sent as application/json".to_string()
        }
        JsonRejection::JsonSyntaxError(_) => format!("Malformed JSON: {}", rejection.body_text()),
        // Wrong types, missing fields and unparsable amounts land here.
        JsonRejection::JsonDataError(_) => format!("Invalid field value: {}", rejection.body_text()),
        _ => rejection.body_text(),
    };
    AppError::BadRequest(anyhow::anyhow!(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use rust_decimal::Decimal;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Line {
        #[validate(length(min = 1, max = 20))]
        unit: String,
        quantity: Decimal,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/invoices")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn extract(req: Request) -> Result<ValidatedJson<Line>, AppError> {
        ValidatedJson::<Line>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let ValidatedJson(line) = extract(json_request(r#"{"unit":"vnt.","quantity":"2.5"}"#))
            .await
            .unwrap();
        assert_eq!(line.unit, "vnt.");
        assert_eq!(line.quantity, Decimal::new(25, 1));
    }

    #[tokio::test]
    async fn rule_violations_are_unprocessable() {
        let err = extract(json_request(r#"{"unit":"","quantity":"1"}"#))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.field_errors().contains_key("unit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_amount_is_a_bad_request() {
        let err = extract(json_request(r#"{"unit":"vnt.","quantity":"du"}"#))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Invalid field value"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = extract(json_request(r#"{"unit":"#)).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Malformed JSON"));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let req = Request::builder()
            .method("POST")
            .uri("/invoices")
            .body(Body::from(r#"{"unit":"vnt.","quantity":"1"}"#))
            .unwrap();
        let err = extract(req).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("application/json"));
    }
}
