//! Error types for load-time and configuration paths.
//!
//! Per-frame tracking and idle animation never return errors; they skip
//! whatever they cannot drive.

/// Errors surfaced to the host page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON from the host could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Skeleton snapshot has dangling parents or cycles
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// Flat landmark buffer has the wrong shape
    #[error("Expected {expected} landmark values, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    /// Avatar asset missing or corrupt
    #[error("Failed to load avatar: {0}")]
    AssetLoad(String),

    /// Camera or inference engine could not be acquired
    #[error("Camera failed: {0}")]
    Tracking(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(target_arch = "wasm32")]
impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
