//! Request extractors.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::Error;
use crate::models::validation::collect_errors;

/// JSON body that is deserialized and then field-validated, with both
/// failure modes surfacing as a 400 validation envelope. Validation always
/// completes before any store call.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| Error::Validation(collect_errors(&errors)))?;

        Ok(ValidatedJson(value))
    }
}
