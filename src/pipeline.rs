//! Pipeline orchestration: locate, normalize, align, binarize.
//!
//! One call runs the whole chain for a subject against a BOLD reference
//! grid. Stages run strictly in order and the first error aborts the run;
//! artifacts written before the failure stay in the output directory for
//! inspection. All paths flow through [`RunContext`], so concurrent runs
//! with distinct output directories do not interact.

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::binarize;
use crate::config::{AlignMode, Engine, Interp, PipelineConfig, RunContext, TissueClass};
use crate::convert::normalize;
use crate::error::{MaskError, Result};
use crate::locate::{locate_sources, SubjectSources};
use crate::mask_ops;
use crate::nifti_io::{read_volume, write_volume, Volume};
use crate::resample::resample_to_reference;

/// Converted (interchange-format) volume names.
const CONVERTED_T1: &str = "niftiConvertedOrigT1.nii.gz";
const CONVERTED_BRAIN: &str = "niftiConvertedBrain.nii.gz";
const CONVERTED_LABELS: &str = "niftiConvertedAparc+aseg.nii.gz";

/// Reference-grid volume names.
const RESAMPLED_T1: &str = "resampledOrigT1.nii.gz";
const RESAMPLED_BRAIN: &str = "resampledBrainMask.nii.gz";
const RESAMPLED_LABELS: &str = "resampledAparc+aseg.nii.gz";

/// Final mask names.
const BINARY_BRAIN: &str = "binaryBrainMask.nii.gz";
const BINARY_WHITE: &str = "binaryWhiteMask.nii.gz";
const BINARY_GRAY: &str = "binaryGrayMask.nii.gz";

/// Estimated anatomical-to-functional transform (estimate mode only).
const ANAT2FUNC: &str = "anat2func.mat";

const MANIFEST: &str = "manifest.json";

/// Paths of the final outputs of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct MaskArtifacts {
    /// Anatomical scan resampled to the reference grid.
    pub resampled_t1: PathBuf,
    /// Binary whole-brain mask.
    pub binary_brain: PathBuf,
    /// Binary white-matter mask.
    pub binary_white: PathBuf,
    /// Binary gray-matter mask.
    pub binary_gray: PathBuf,
    /// Run manifest (inputs, parameters, outputs, timestamp).
    pub manifest: PathBuf,
}

#[derive(Serialize)]
struct Manifest<'a> {
    created: String,
    subject_dir: &'a Path,
    reference: &'a Path,
    config: &'a PipelineConfig,
    sources: ManifestSources<'a>,
    artifacts: &'a MaskArtifacts,
}

#[derive(Serialize)]
struct ManifestSources<'a> {
    orig_t1: &'a Path,
    brain: &'a Path,
    labels: &'a Path,
}

/// Run the full pipeline for one subject.
///
/// `subject_dir` is a recon-all output directory, `reference` the BOLD
/// volume defining the target grid. Everything is written under `ctx`'s
/// output directory.
pub fn run(
    config: &PipelineConfig,
    ctx: &RunContext,
    subject_dir: &Path,
    reference: &Path,
) -> Result<MaskArtifacts> {
    // Preflight: all inputs, tool binaries, and the reference must resolve
    // before any tool runs.
    let sources = locate_sources(subject_dir)?;
    if let Engine::Tools { paths, .. } = &config.engine {
        paths.verify()?;
    }
    if !reference.is_file() {
        return Err(MaskError::MissingInput {
            path: reference.to_path_buf(),
        });
    }
    let reference_volume = read_volume(reference).map_err(|reason| {
        MaskError::ReferenceMismatch {
            path: reference.to_path_buf(),
            reason,
        }
    })?;
    info!(
        "reference grid {:?} voxels, subject {}",
        reference_volume.dims(),
        subject_dir.display()
    );

    let converted = normalize_sources(config, ctx, &sources)?;

    let resampled = match &config.engine {
        Engine::Tools { paths, align } => {
            align_with_tools(ctx, paths, align, &converted, reference)?
        }
        Engine::Library => align_in_process(ctx, &converted, &reference_volume)?,
    };

    binarize_masks(config, ctx, &resampled, &reference_volume)?;

    let artifacts = MaskArtifacts {
        resampled_t1: resampled.t1.clone(),
        binary_brain: ctx.artifact(BINARY_BRAIN),
        binary_white: ctx.artifact(BINARY_WHITE),
        binary_gray: ctx.artifact(BINARY_GRAY),
        manifest: ctx.artifact(MANIFEST),
    };
    write_manifest(config, ctx, subject_dir, reference, &sources, &artifacts)?;

    info!("run complete, outputs in {}", ctx.output_dir().display());
    Ok(artifacts)
}

struct Converted {
    t1: PathBuf,
    brain: PathBuf,
    labels: PathBuf,
}

struct Resampled {
    t1: PathBuf,
    brain: PathBuf,
    labels: PathBuf,
}

fn normalize_sources(
    config: &PipelineConfig,
    ctx: &RunContext,
    sources: &SubjectSources,
) -> Result<Converted> {
    let tools = match &config.engine {
        Engine::Tools { paths, .. } => Some(paths),
        Engine::Library => None,
    };

    Ok(Converted {
        t1: normalize(&sources.orig_t1, &ctx.artifact(CONVERTED_T1), tools)?,
        brain: normalize(&sources.brain, &ctx.artifact(CONVERTED_BRAIN), tools)?,
        labels: normalize(&sources.labels, &ctx.artifact(CONVERTED_LABELS), tools)?,
    })
}

fn align_with_tools(
    ctx: &RunContext,
    paths: &crate::config::ToolPaths,
    align: &AlignMode,
    converted: &Converted,
    reference: &Path,
) -> Result<Resampled> {
    // The anatomical scan anchors the registration. In estimate mode it is
    // registered once, writing the transform, and the remaining volumes
    // apply that same transform; in apply mode all three use the supplied
    // (or identity) transform with header geometry.
    let t1_out = ctx.artifact(RESAMPLED_T1);
    let (t1, init) = match align {
        AlignMode::Estimate { .. } => {
            let mat = ctx.artifact(ANAT2FUNC);
            let t1 = crate::align::run_flirt(
                paths,
                align,
                &converted.t1,
                reference,
                &t1_out,
                Some(mat.as_path()),
                None,
                Interp::Trilinear,
            )?;
            (t1, Some(mat))
        }
        AlignMode::ApplyTransform => {
            let t1 = crate::align::run_flirt(
                paths,
                align,
                &converted.t1,
                reference,
                &t1_out,
                None,
                paths.identity_mat.as_deref(),
                Interp::Trilinear,
            )?;
            (t1, paths.identity_mat.clone())
        }
    };
    let brain = crate::align::run_flirt(
        paths,
        &AlignMode::ApplyTransform,
        &converted.brain,
        reference,
        &ctx.artifact(RESAMPLED_BRAIN),
        None,
        init.as_deref(),
        Interp::Trilinear,
    )?;
    let labels = crate::align::run_flirt(
        paths,
        &AlignMode::ApplyTransform,
        &converted.labels,
        reference,
        &ctx.artifact(RESAMPLED_LABELS),
        None,
        init.as_deref(),
        Interp::Nearest,
    )?;

    Ok(Resampled { t1, brain, labels })
}

fn align_in_process(
    ctx: &RunContext,
    converted: &Converted,
    reference: &Volume,
) -> Result<Resampled> {
    let resample_one = |source: &Path, out_name: &str, interp: Interp| -> Result<PathBuf> {
        let moving = read_volume(source).map_err(|reason| MaskError::Registration {
            moving: source.to_path_buf(),
            reason,
        })?;
        let resampled =
            resample_to_reference(&moving, reference, interp).map_err(|reason| {
                MaskError::Registration {
                    moving: source.to_path_buf(),
                    reason,
                }
            })?;
        let out = ctx.artifact(out_name);
        write_volume(&out, &resampled).map_err(|reason| MaskError::Registration {
            moving: source.to_path_buf(),
            reason,
        })?;
        Ok(out)
    };

    Ok(Resampled {
        t1: resample_one(&converted.t1, RESAMPLED_T1, Interp::Trilinear)?,
        brain: resample_one(&converted.brain, RESAMPLED_BRAIN, Interp::Trilinear)?,
        labels: resample_one(&converted.labels, RESAMPLED_LABELS, Interp::Nearest)?,
    })
}

fn binarize_masks(
    config: &PipelineConfig,
    ctx: &RunContext,
    resampled: &Resampled,
    reference: &Volume,
) -> Result<()> {
    match &config.engine {
        Engine::Tools { paths, .. } => {
            binarize::threshold_binarize(
                paths,
                &resampled.brain,
                &ctx.artifact(BINARY_BRAIN),
                config.brain_threshold,
            )?;
            binarize::tissue_binarize(
                paths,
                &resampled.labels,
                &ctx.artifact(BINARY_WHITE),
                TissueClass::White,
                config.erode_voxels,
            )?;
            // Erosion applies to white matter only.
            binarize::tissue_binarize(
                paths,
                &resampled.labels,
                &ctx.artifact(BINARY_GRAY),
                TissueClass::Gray,
                0,
            )?;
        }
        Engine::Library => {
            let wrap = |path: &Path, reason: String| MaskError::Binarization {
                input: path.to_path_buf(),
                reason,
            };

            let brain =
                read_volume(&resampled.brain).map_err(|r| wrap(&resampled.brain, r))?;
            let mask = mask_ops::threshold_mask(&brain, config.brain_threshold);
            debug_assert!(mask.same_grid(reference, 1e-3));
            write_volume(&ctx.artifact(BINARY_BRAIN), &mask)
                .map_err(|r| wrap(&resampled.brain, r))?;

            let labels =
                read_volume(&resampled.labels).map_err(|r| wrap(&resampled.labels, r))?;

            let mut white = mask_ops::tissue_mask(&labels, TissueClass::White);
            white = mask_ops::erode_mask(&white, config.erode_voxels);
            write_volume(&ctx.artifact(BINARY_WHITE), &white)
                .map_err(|r| wrap(&resampled.labels, r))?;

            let gray = mask_ops::tissue_mask(&labels, TissueClass::Gray);
            write_volume(&ctx.artifact(BINARY_GRAY), &gray)
                .map_err(|r| wrap(&resampled.labels, r))?;
        }
    }
    Ok(())
}

fn write_manifest(
    config: &PipelineConfig,
    ctx: &RunContext,
    subject_dir: &Path,
    reference: &Path,
    sources: &SubjectSources,
    artifacts: &MaskArtifacts,
) -> Result<()> {
    let manifest = Manifest {
        created: chrono::Utc::now().to_rfc3339(),
        subject_dir,
        reference,
        config,
        sources: ManifestSources {
            orig_t1: &sources.orig_t1,
            brain: &sources.brain,
            labels: &sources.labels,
        },
        artifacts,
    };

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(ctx.artifact(MANIFEST), json)?;
    Ok(())
}
