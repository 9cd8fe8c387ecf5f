//! Format Normalizer: native-format volumes to the NIfTI interchange format.
//!
//! Each conversion is one checked `mri_convert` invocation writing to a
//! deterministic path inside the run's output directory. Conversions are
//! independent and idempotent; re-running overwrites only the conversion's
//! own output. Sources already in NIfTI form are copied through unchanged.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::ToolPaths;
use crate::error::{MaskError, Result};

/// Whether a path already carries the interchange format extension.
fn is_nifti(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

/// Normalize one source volume to `dest`.
///
/// `.mgz` sources require `tools` (the converter); NIfTI sources are copied.
/// Fails with [`MaskError::Conversion`] when the converter exits non-zero,
/// leaves no output behind, or an mgz source is given without tools.
pub fn normalize(source: &Path, dest: &Path, tools: Option<&ToolPaths>) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(MaskError::MissingInput {
            path: source.to_path_buf(),
        });
    }

    if is_nifti(source) {
        info!("{} already NIfTI, copying to {}", source.display(), dest.display());
        std::fs::copy(source, dest).map_err(|e| MaskError::Conversion {
            input: source.to_path_buf(),
            reason: format!("copy to {} failed: {e}", dest.display()),
        })?;
        return Ok(dest.to_path_buf());
    }

    let tools = tools.ok_or_else(|| MaskError::Conversion {
        input: source.to_path_buf(),
        reason: "native-format input requires the external converter, \
                 which the library engine does not have"
            .to_string(),
    })?;

    let args = vec![
        source.to_string_lossy().into_owned(),
        dest.to_string_lossy().into_owned(),
    ];
    crate::tools::run_checked(&tools.mri_convert(), &args, dest).map_err(|reason| {
        MaskError::Conversion {
            input: source.to_path_buf(),
            reason,
        }
    })?;

    Ok(dest.to_path_buf())
}
