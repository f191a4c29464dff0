//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and a helper
//! to extract + validate JSON bodies in handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
///
/// Combines deserialization error mapping (400) with business rule
/// validation (422). Handlers should use:
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_validated_json(body)?;
///     // use req...
/// }
/// ```
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Dto {
        count: u32,
    }

    impl Validate for Dto {
        fn validate(&self) -> Result<(), String> {
            if self.count == 0 {
                return Err("count must be greater than zero".into());
            }
            Ok(())
        }
    }

    #[test]
    fn valid_body_passes() {
        let dto = extract_validated_json(Ok(Json(Dto { count: 3 }))).unwrap();
        assert_eq!(dto.count, 3);
    }

    #[test]
    fn business_rule_failure_is_validation_error() {
        let err = extract_validated_json(Ok(Json(Dto { count: 0 }))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
