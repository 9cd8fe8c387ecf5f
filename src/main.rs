//! Command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::error;

use fsmask::{AlignMode, Engine, PipelineConfig, RunContext, ToolPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    /// FreeSurfer/FSL subprocesses
    Tools,
    /// In-process resampling and binarization (NIfTI inputs only)
    Library,
}

/// Derive binary brain/white/gray masks from a FreeSurfer recon-all
/// directory, resampled to a BOLD reference grid.
#[derive(Parser, Debug)]
#[command(name = "fsmask", version, about)]
struct Cli {
    /// Subject's recon-all output directory
    subject_dir: PathBuf,

    /// BOLD reference volume defining the target grid
    template_bold: PathBuf,

    /// Output directory for all artifacts
    output_dir: PathBuf,

    /// Execution engine
    #[arg(long, value_enum, default_value = "tools")]
    engine: EngineArg,

    /// FreeSurfer bin directory
    #[arg(long, default_value = "/opt/freesurfer/bin")]
    freesurfer_bin: PathBuf,

    /// FSL bin directory
    #[arg(long, default_value = "/usr/lib/fsl/bin")]
    fsl_bin: PathBuf,

    /// Explicit transform matrix for apply mode (e.g. FSL's ident.mat)
    #[arg(long)]
    identity_mat: Option<PathBuf>,

    /// Estimate a fresh registration with this many degrees of freedom
    /// instead of applying header geometry
    #[arg(long)]
    dof: Option<u32>,

    /// Brain-mask threshold (strict greater-than)
    #[arg(long, default_value_t = 50.0)]
    brain_threshold: f32,

    /// White-matter erosion radius in voxels
    #[arg(long, default_value_t = 0)]
    erode: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let engine = match cli.engine {
        EngineArg::Library => Engine::Library,
        EngineArg::Tools => {
            let align = match cli.dof {
                Some(dof) => AlignMode::Estimate { dof },
                None => AlignMode::ApplyTransform,
            };
            Engine::Tools {
                paths: ToolPaths {
                    freesurfer_bin: cli.freesurfer_bin,
                    fsl_bin: cli.fsl_bin,
                    identity_mat: cli.identity_mat,
                },
                align,
            }
        }
    };

    let config = PipelineConfig {
        engine,
        brain_threshold: cli.brain_threshold,
        erode_voxels: cli.erode,
    };

    let ctx = match RunContext::new(&cli.output_dir) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match fsmask::run(&config, &ctx, &cli.subject_dir, &cli.template_bold) {
        Ok(artifacts) => {
            println!("{}", artifacts.manifest.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[{}] {e}", e.stage());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
