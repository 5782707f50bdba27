//! # Deck Request Bodies
//!
//! [`DeckJson`] extracts and checks the JSON body of a deck command. A body
//! that is not JSON, or does not match the shape of the request, is rejected
//! with 400 before the handler runs. A body that parses but breaks a deck
//! rule (an empty reorder list, a blank section draft) is rejected with 422.
//! Both messages name the request kind so a caller sending the wrong body to
//! an endpoint can tell which one it hit.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use deck_core::SectionDraft;
use deck_store::FieldOverrides;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::routes::sections::{GenerateSectionRequest, ReorderRequest, UpdateFieldRequest};

/// A JSON body accepted by a deck endpoint.
pub trait DeckBody {
    /// Request kind used in rejection messages.
    const KIND: &'static str;

    /// Deck rules serde cannot express.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// JSON body extractor rejecting with [`AppError`].
#[derive(Debug)]
pub struct DeckJson<T>(pub T);

impl<S, T> FromRequest<S> for DeckJson<T>
where
    T: DeserializeOwned + DeckBody,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(malformed::<T>)?;
        body.check()
            .map_err(|reason| AppError::Validation(format!("{}: {reason}", T::KIND)))?;
        Ok(Self(body))
    }
}

fn malformed<T: DeckBody>(rejection: JsonRejection) -> AppError {
    tracing::debug!(kind = T::KIND, error = %rejection, "request body rejected");
    AppError::BadRequest(format!("invalid {}: {}", T::KIND, rejection.body_text()))
}

impl DeckBody for SectionDraft {
    const KIND: &'static str = "section draft";

    fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())
    }
}

impl DeckBody for GenerateSectionRequest {
    const KIND: &'static str = "generator output";

    fn check(&self) -> Result<(), String> {
        if self.output.trim().is_empty() {
            return Err("output must not be empty".to_string());
        }
        Ok(())
    }
}

impl DeckBody for ReorderRequest {
    const KIND: &'static str = "reorder request";

    fn check(&self) -> Result<(), String> {
        if self.ids.is_empty() {
            return Err("ids must not be empty".to_string());
        }
        Ok(())
    }
}

impl DeckBody for UpdateFieldRequest {
    const KIND: &'static str = "field update";
}

impl DeckBody for FieldOverrides {
    const KIND: &'static str = "locale overrides";
}
