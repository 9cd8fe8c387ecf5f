//! Spatial Aligner, subprocess form: `flirt` registration and resampling.
//!
//! Two modes cover the pipeline variants. Apply mode resamples with an
//! existing (or identity) transform and never re-estimates; estimate mode
//! runs a full N-degree-of-freedom search and writes the resulting
//! transform as a run artifact, which later apply-mode calls reuse via
//! `init`. In both, the output grid matches the reference on success, and
//! label volumes must be requested with [`Interp::Nearest`] by the caller.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::{AlignMode, Interp, ToolPaths};
use crate::error::{MaskError, Result};

/// Assemble the flirt argument list for one align/resample invocation.
fn build_args(
    mode: &AlignMode,
    moving: &Path,
    reference: &Path,
    out: &Path,
    omat: Option<&Path>,
    init: Option<&Path>,
    interp: Interp,
) -> Vec<String> {
    let mut args = vec![
        "-in".to_string(),
        moving.to_string_lossy().into_owned(),
        "-ref".to_string(),
        reference.to_string_lossy().into_owned(),
    ];

    match mode {
        AlignMode::ApplyTransform => {
            args.push("-usesqform".to_string());
            args.push("-applyxfm".to_string());
            if let Some(mat) = init {
                args.push("-init".to_string());
                args.push(mat.to_string_lossy().into_owned());
            }
        }
        AlignMode::Estimate { dof } => {
            args.push("-dof".to_string());
            args.push(dof.to_string());
            if let Some(mat) = omat {
                args.push("-omat".to_string());
                args.push(mat.to_string_lossy().into_owned());
            }
        }
    }

    if interp == Interp::Nearest {
        args.push("-interp".to_string());
        args.push("nearestneighbour".to_string());
    }

    args.push("-out".to_string());
    args.push(out.to_string_lossy().into_owned());
    args
}

/// Align/resample `moving` onto `reference`'s grid, writing to `out`.
///
/// `omat` receives the estimated transform in [`AlignMode::Estimate`];
/// `init` supplies an existing transform for apply mode. Fails with
/// [`MaskError::Registration`] when flirt errors or produces no output.
pub fn run_flirt(
    tools: &ToolPaths,
    mode: &AlignMode,
    moving: &Path,
    reference: &Path,
    out: &Path,
    omat: Option<&Path>,
    init: Option<&Path>,
    interp: Interp,
) -> Result<PathBuf> {
    let args = build_args(mode, moving, reference, out, omat, init, interp);

    info!(
        "aligning {} -> grid of {}",
        moving.display(),
        reference.display()
    );

    crate::tools::run_checked(&tools.flirt(), &args, out).map_err(|reason| {
        MaskError::Registration {
            moving: moving.to_path_buf(),
            reason,
        }
    })?;

    Ok(out.to_path_buf())
}
