//! The single request handler shared by all generation operations.
//!
//! Each route instantiates [`generate`] with its request type; the type's
//! [`PromptTemplate`] impl picks the operation, which in turn fixes the
//! system instruction, decoding parameters and response field.

use axum::{extract::State, Extension, Json};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;
use std::time::Instant;
use tracing::Instrument;
use validator::Validate;

use crate::models::GenerationResponse;
use crate::services::prompt::{self, Prompt, PromptTemplate};
use crate::services::providers::{ContentSegment, TextProvider};
use crate::services::Operation;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn generate<T>(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<T>,
) -> Result<Json<GenerationResponse>, AppError>
where
    T: PromptTemplate + DeserializeOwned + Validate + Send + 'static,
{
    let operation = T::OPERATION;
    let prompt = prompt::build(&request);
    let payload = run_generation(state.text_provider.as_ref(), operation, &prompt)
        .instrument(tracing::info_span!("generation", request_id = %request_id))
        .await?;

    Ok(Json(GenerationResponse {
        field: operation.spec().response_field,
        payload,
    }))
}

/// Call the provider once and turn its answer into the response payload.
///
/// Provider failures are logged here in full and reported to the caller
/// only as the operation's generic failure message. A non-text answer is
/// not a failure: the operation's fallback text becomes the payload.
pub async fn run_generation(
    provider: &dyn TextProvider,
    operation: Operation,
    prompt: &Prompt,
) -> Result<String, AppError> {
    let spec = operation.spec();
    let params = operation.generation_params();
    let started = Instant::now();

    tracing::info!(
        operation = %operation,
        model = provider.model(),
        prompt_len = prompt.user_prompt.len(),
        "Starting generation"
    );

    let response = provider
        .generate(prompt.system_instruction, &prompt.user_prompt, &params)
        .await
        .map_err(|e| {
            tracing::error!(
                operation = %operation,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Generation failed"
            );
            AppError::GenerationFailed(spec.failure_message.to_string())
        })?;

    tracing::debug!(
        operation = %operation,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        stop_reason = response.stop_reason.as_deref().unwrap_or("-"),
        "Provider usage"
    );
    tracing::info!(
        operation = %operation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generation completed"
    );

    match response.segment {
        ContentSegment::Text(text) => Ok(text),
        ContentSegment::NonText(kind) => {
            tracing::warn!(
                operation = %operation,
                segment_type = %kind,
                "Model returned non-text content; using fallback text"
            );
            Ok(spec.fallback_text.to_string())
        }
    }
}
