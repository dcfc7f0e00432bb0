use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::{JsonRejection, PathRejection}},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Segment;

use crate::web::error::AppError;

/// `Json` whose rejections (bad syntax, wrong types, missing content type)
/// are reported as 400 through `AppError` instead of axum's plain-text 415/422.
/// A value of the wrong type is reported under its top-level field name.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::InvalidInput(rejection.body_text()))?;
        from_json_value(value).map(ValidatedJson)
    }
}

fn from_json_value<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let field = match err.path().iter().next() {
            Some(Segment::Map { key }) => Some(key.clone()),
            _ => None,
        };
        let message = err.inner().to_string();
        match field {
            Some(field) => AppError::validation(&field, message),
            None => AppError::InvalidInput(message),
        }
    })
}

/// `Path` where an id that does not parse names no existing record, so it is a 404.
pub struct ValidatedPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidatedPath(value)),
            Err(_) => Err(AppError::NotFound("Not found.".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: Option<String>,
        #[allow(dead_code)]
        tags: Option<Vec<i32>>,
    }

    #[test]
    fn test_type_errors_name_the_field() {
        let Err(AppError::Validation(errors)) =
            from_json_value::<Payload>(json!({ "tags": ["a"] }))
        else {
            panic!("expected a field error");
        };
        assert!(errors.get("tags").is_some());

        let Err(AppError::Validation(errors)) = from_json_value::<Payload>(json!({ "name": 5 }))
        else {
            panic!("expected a field error");
        };
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn test_non_object_body_is_invalid_input() {
        assert!(matches!(
            from_json_value::<Payload>(json!([1, 2])),
            Err(AppError::InvalidInput(_))
        ));
        assert!(from_json_value::<Payload>(json!({ "name": "Vegan" })).is_ok());
    }
}
