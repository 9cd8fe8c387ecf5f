//! fsmask: tissue masks from FreeSurfer segmentations on a BOLD grid
//!
//! Derives binary brain, white-matter, and gray-matter masks from a
//! recon-all output directory and resamples them onto the voxel grid of a
//! functional reference volume.
//!
//! # Modules
//! - `locate`: canonical source paths inside a recon-all directory
//! - `convert`: native-format to NIfTI normalization
//! - `align`: subprocess resampling/registration via `flirt`
//! - `resample`: in-process grid resampling
//! - `binarize`: subprocess mask extraction via `fslmaths`/`mri_binarize`
//! - `mask_ops`: in-process thresholding, label classes, erosion
//! - `pipeline`: end-to-end orchestration
//! - `nifti_io`: volume + affine I/O
//! - `tools`: checked subprocess invocation

// Pipeline stages
pub mod align;
pub mod binarize;
pub mod convert;
pub mod locate;
pub mod mask_ops;
pub mod resample;

// Orchestration and configuration
pub mod config;
pub mod error;
pub mod pipeline;

// I/O and process plumbing
pub mod nifti_io;
pub mod tools;

pub use config::{AlignMode, Engine, Interp, PipelineConfig, RunContext, TissueClass, ToolPaths};
pub use error::{MaskError, Result};
pub use pipeline::{run, MaskArtifacts};
