//! Error types for the fitscan pipeline

use thiserror::Error;

/// Result type alias for fitscan operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Comprehensive error types for capture processing
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required capture image is absent from storage
    #[error("Required image missing: {view}")]
    MissingImage { view: String },

    /// Image bytes could not be decoded
    #[error("Failed to decode image: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Object storage read/write failed
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External inference service failed at the transport level
    #[error("Inference error ({service}): {message}")]
    Inference { service: String, message: String },

    /// Color correction could not be computed
    #[error("Color correction failed: {reason}")]
    ColorCorrection { reason: String },

    /// Capture job not found in the job store
    #[error("Unknown capture: {capture_id}")]
    UnknownCapture { capture_id: String },

    /// Result document could not be persisted
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCv {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },

    /// Generic processing error
    #[error("Processing error: {0}")]
    Processing(String),
}

impl PipelineError {
    /// Create an image decode error with context
    pub fn decode<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageDecode {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage error with context
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCv {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Check whether this error is fatal to the capture.
    ///
    /// Fatal errors abort the job immediately without consuming the retry
    /// budget; everything else is treated as transient and eligible for a
    /// full-pipeline retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingImage { .. } | PipelineError::InvalidParameter { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::MissingImage { view } => {
                format!("The {view} photo is missing. Please retake it and resubmit the capture.")
            }
            PipelineError::ImageDecode { .. } => {
                "Could not read one of the uploaded photos. Please check the file and try again."
                    .to_string()
            }
            PipelineError::Inference { service, .. } => {
                format!("The {service} service is unavailable. Please try again later.")
            }
            PipelineError::ColorCorrection { .. } => {
                "Could not normalize photo colors. Please retake the photos in even lighting."
                    .to_string()
            }
            _ => "Capture processing failed. Please resubmit the capture.".to_string(),
        }
    }
}
