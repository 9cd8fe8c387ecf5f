//! Mask Binarizer, subprocess form: `fslmaths` thresholding and
//! `mri_binarize` tissue-class extraction.
//!
//! Each output mask is one checked invocation. The brain mask thresholds
//! the resampled brain volume; the white/gray masks extract label classes
//! from the resampled atlas, optionally eroded. An erosion count of zero
//! omits the erosion flag entirely instead of passing `--erode 0`.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::{TissueClass, ToolPaths};
use crate::error::{MaskError, Result};

/// Threshold-binarize `input` into `out`: `fslmaths <in> -thr T -bin <out>`.
pub fn threshold_binarize(
    tools: &ToolPaths,
    input: &Path,
    out: &Path,
    threshold: f32,
) -> Result<PathBuf> {
    info!(
        "thresholding {} at {threshold} -> {}",
        input.display(),
        out.display()
    );

    let args = vec![
        input.to_string_lossy().into_owned(),
        "-thr".to_string(),
        threshold.to_string(),
        "-bin".to_string(),
        out.to_string_lossy().into_owned(),
    ];
    crate::tools::run_checked(&tools.fslmaths(), &args, out).map_err(|reason| {
        MaskError::Binarization {
            input: input.to_path_buf(),
            reason,
        }
    })?;

    Ok(out.to_path_buf())
}

/// Extract one tissue class from a label volume:
/// `mri_binarize --i <in> --wm|--gm [--erode N] --o <out>`.
pub fn tissue_binarize(
    tools: &ToolPaths,
    input: &Path,
    out: &Path,
    class: TissueClass,
    erode_voxels: u32,
) -> Result<PathBuf> {
    info!(
        "extracting {:?} mask from {} -> {}",
        class,
        input.display(),
        out.display()
    );

    let mut args = vec![
        "--i".to_string(),
        input.to_string_lossy().into_owned(),
        class.flag().to_string(),
    ];
    if erode_voxels > 0 {
        args.push("--erode".to_string());
        args.push(erode_voxels.to_string());
    }
    args.push("--o".to_string());
    args.push(out.to_string_lossy().into_owned());

    crate::tools::run_checked(&tools.mri_binarize(), &args, out).map_err(|reason| {
        MaskError::Binarization {
            input: input.to_path_buf(),
            reason,
        }
    })?;

    Ok(out.to_path_buf())
}
