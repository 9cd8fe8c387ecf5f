//! Error taxonomy for the mask pipeline.
//!
//! Every external tool failure wraps the tool's exit status and captured
//! stderr so a failed run can be diagnosed from the error alone. No stage
//! recovers locally: the first error aborts the run, and partial outputs
//! already written stay on disk for inspection.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, MaskError>;

/// Pipeline error kinds, one per failing stage.
#[derive(Error, Debug)]
pub enum MaskError {
    /// A required source file is absent from the segmentation directory,
    /// or a caller-supplied path (reference, transform, tool binary) does
    /// not exist. Raised before any external tool is invoked.
    #[error("required input missing: {}", path.display())]
    MissingInput { path: PathBuf },

    /// Format conversion failed: the converter exited non-zero, its output
    /// file was absent afterwards, or an mgz input was given to the
    /// library engine (which has no converter).
    #[error("conversion failed for {}: {reason}", input.display())]
    Conversion { input: PathBuf, reason: String },

    /// The registration/resampling tool errored or produced no output.
    #[error("registration failed for {}: {reason}", moving.display())]
    Registration { moving: PathBuf, reason: String },

    /// The reference volume exists but cannot be read as a valid volume.
    #[error("reference volume unusable {}: {reason}", path.display())]
    ReferenceMismatch { path: PathBuf, reason: String },

    /// Thresholding or label-class extraction failed.
    #[error("binarization failed for {}: {reason}", input.display())]
    Binarization { input: PathBuf, reason: String },

    /// Filesystem error outside any specific tool invocation.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MaskError {
    /// Name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            MaskError::MissingInput { .. } => "locate",
            MaskError::Conversion { .. } => "normalize",
            MaskError::Registration { .. } => "align",
            MaskError::ReferenceMismatch { .. } => "align",
            MaskError::Binarization { .. } => "binarize",
            MaskError::Io(_) => "io",
        }
    }

    /// Process exit code for the CLI, one per error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            MaskError::MissingInput { .. } => 2,
            MaskError::Conversion { .. } => 3,
            MaskError::Registration { .. } => 4,
            MaskError::ReferenceMismatch { .. } => 5,
            MaskError::Binarization { .. } => 6,
            MaskError::Io(_) => 7,
        }
    }
}
