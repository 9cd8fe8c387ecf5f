//! Pipeline configuration and run-scoped output naming.
//!
//! The three historical pipeline variants (apply an identity transform,
//! estimate a fresh registration, or resample in-process) are one pipeline
//! parameterized by [`Engine`] and [`AlignMode`] rather than separate code
//! paths. All intermediate and final artifacts are named through
//! [`RunContext`] so concurrent per-subject runs with distinct output
//! directories never collide.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;

/// Interpolation policy for a resampling/registration step.
///
/// `Nearest` is mandatory for label-valued volumes; the caller chooses,
/// since the aligner never infers volume semantics from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Interp {
    Trilinear,
    Nearest,
}

/// Tissue class for label-based mask extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TissueClass {
    White,
    Gray,
}

impl TissueClass {
    /// The `mri_binarize` flag selecting this class.
    pub fn flag(&self) -> &'static str {
        match self {
            TissueClass::White => "--wm",
            TissueClass::Gray => "--gm",
        }
    }
}

/// Locations of the external tool installations.
#[derive(Debug, Clone, Serialize)]
pub struct ToolPaths {
    /// FreeSurfer `bin` directory (`mri_convert`, `mri_binarize`).
    pub freesurfer_bin: PathBuf,
    /// FSL `bin` directory (`flirt`, `fslmaths`).
    pub fsl_bin: PathBuf,
    /// Optional explicit transform for apply mode, typically FSL's
    /// `etc/flirtsch/ident.mat`. When absent, `flirt -usesqform` relies on
    /// the header geometry alone.
    pub identity_mat: Option<PathBuf>,
}

impl ToolPaths {
    pub fn mri_convert(&self) -> PathBuf {
        self.freesurfer_bin.join("mri_convert")
    }

    pub fn mri_binarize(&self) -> PathBuf {
        self.freesurfer_bin.join("mri_binarize")
    }

    pub fn flirt(&self) -> PathBuf {
        self.fsl_bin.join("flirt")
    }

    pub fn fslmaths(&self) -> PathBuf {
        self.fsl_bin.join("fslmaths")
    }

    /// Check that every tool binary (and the transform, when supplied)
    /// exists. Run in preflight so a bad installation path fails before
    /// any conversion starts.
    pub fn verify(&self) -> Result<()> {
        let mut required = vec![
            self.mri_convert(),
            self.mri_binarize(),
            self.flirt(),
            self.fslmaths(),
        ];
        if let Some(mat) = &self.identity_mat {
            required.push(mat.clone());
        }
        for path in required {
            if !path.is_file() {
                return Err(crate::error::MaskError::MissingInput { path });
            }
        }
        Ok(())
    }
}

/// How the subprocess aligner maps the moving volume onto the reference.
#[derive(Debug, Clone, Serialize)]
pub enum AlignMode {
    /// Apply an existing (or identity) transform without re-estimating:
    /// `flirt -usesqform -applyxfm [-init <mat>]`. Used when the moving and
    /// reference grids are in extrinsically known correspondence.
    ApplyTransform,
    /// Estimate a fresh rigid/affine registration with the given degrees of
    /// freedom (`flirt -dof N -omat <mat>`) and apply it. The estimated
    /// transform is written as a run artifact.
    Estimate { dof: u32 },
}

/// Execution engine: external subprocess tools, or fully in-process.
#[derive(Debug, Clone, Serialize)]
pub enum Engine {
    /// FreeSurfer + FSL subprocesses.
    Tools { paths: ToolPaths, align: AlignMode },
    /// In-process grid resampling and binarization; no subprocess is ever
    /// spawned. Requires NIfTI sources (there is no mgz converter).
    Library,
}

/// Full parameterization of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub engine: Engine,
    /// Brain-mask threshold, strict greater-than (default 50.0).
    pub brain_threshold: f32,
    /// White-matter erosion radius in voxels. `0` omits the erosion flag
    /// entirely rather than passing `--erode 0` (the external tool is not
    /// guaranteed to treat the two identically).
    pub erode_voxels: u32,
}

impl PipelineConfig {
    pub fn new(engine: Engine) -> Self {
        PipelineConfig {
            engine,
            brain_threshold: 50.0,
            erode_voxels: 0,
        }
    }
}

/// Run-scoped output directory and artifact naming.
///
/// All outputs of one run live flat inside `output_dir` under fixed
/// semantic names; there is no global or static path state and no shared
/// temp files, so concurrent runs with distinct output directories are
/// independent.
#[derive(Debug, Clone)]
pub struct RunContext {
    output_dir: PathBuf,
}

impl RunContext {
    /// Create the context, creating the output directory if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(RunContext { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of a named artifact inside the run's output directory.
    pub fn artifact(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}
