//! Checked subprocess invocation.
//!
//! Every external tool call goes through [`run_checked`]: one process per
//! invocation, exit status checked individually, stderr captured into the
//! failure reason, and the expected output artifact verified afterwards.
//! Chaining independent commands into a single shell line (which reports
//! only the last command's status) is deliberately not supported.

use std::path::Path;
use std::process::Command;

use log::{debug, info};

/// Run `program` with `args`, blocking until exit.
///
/// Returns a failure reason when the program cannot be spawned, exits
/// non-zero, or `expected_output` is absent afterwards. The caller wraps
/// the reason in the stage-appropriate error kind.
pub fn run_checked(
    program: &Path,
    args: &[String],
    expected_output: &Path,
) -> std::result::Result<(), String> {
    info!("running {} {}", program.display(), args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("failed to spawn {}: {e}", program.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        ));
    }

    debug!("{} completed with {}", program.display(), output.status);

    if !expected_output.is_file() {
        return Err(format!(
            "{} reported success but produced no output at {}",
            program.display(),
            expected_output.display()
        ));
    }

    Ok(())
}
