//! Source Locator: canonical input paths inside a recon-all directory.
//!
//! Pure path computation plus existence checks; no other I/O. The required
//! volumes live under `mri/` in the segmentation output: the raw anatomical
//! (`orig`), the skull-stripped brain (`brain`), and the combined label
//! atlas (`aparc+aseg`). Each may be stored in the segmentation tool's
//! native `.mgz` format or already as NIfTI (fmriprep-style layouts).

use std::path::{Path, PathBuf};

use crate::error::{MaskError, Result};

/// Extensions probed for each source volume, in order of preference.
const SOURCE_EXTENSIONS: [&str; 3] = ["mgz", "nii.gz", "nii"];

/// Resolved paths of the three required source volumes. Immutable inputs;
/// the pipeline never writes to any of them.
#[derive(Debug, Clone)]
pub struct SubjectSources {
    /// Raw anatomical scan (`mri/orig`).
    pub orig_t1: PathBuf,
    /// Skull-stripped brain volume (`mri/brain`).
    pub brain: PathBuf,
    /// Combined cortical + subcortical label volume (`mri/aparc+aseg`).
    pub labels: PathBuf,
}

/// Resolve the canonical source volumes under `subject_dir`.
///
/// Fails with [`MaskError::MissingInput`] naming the first absent volume;
/// runs before any external tool is invoked.
pub fn locate_sources(subject_dir: &Path) -> Result<SubjectSources> {
    let mri = subject_dir.join("mri");
    if !mri.is_dir() {
        return Err(MaskError::MissingInput { path: mri });
    }

    Ok(SubjectSources {
        orig_t1: find_volume(&mri, "orig")?,
        brain: find_volume(&mri, "brain")?,
        labels: find_volume(&mri, "aparc+aseg")?,
    })
}

/// Probe `<dir>/<stem>.<ext>` for each known extension.
fn find_volume(dir: &Path, stem: &str) -> Result<PathBuf> {
    for ext in SOURCE_EXTENSIONS {
        let candidate = dir.join(format!("{stem}.{ext}"));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    // Report the native-format path as the missing one.
    Err(MaskError::MissingInput {
        path: dir.join(format!("{stem}.mgz")),
    })
}
