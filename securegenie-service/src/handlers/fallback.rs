use service_core::error::AppError;

/// Unknown paths answer in the same JSON shape as every other error.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Known API path, wrong method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
