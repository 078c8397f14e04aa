//! Running external tools (tar, gpg)

use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Run a command to completion, optionally feeding `input` on stdin
///
/// Returns a one-line description of the failure when the command cannot be
/// started or exits unsuccessfully.
pub(crate) fn run(cmd: &mut Command, input: Option<&[u8]>) -> Result<(), String> {
    let program = cmd.get_program().to_string_lossy().into_owned();

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("failed to run {}: {}", program, e))?;

    // Dropping stdin closes the pipe before the child is reaped
    let written = match (input, child.stdin.take()) {
        (Some(input), Some(mut stdin)) => stdin.write_all(input),
        _ => Ok(()),
    };

    let out = child
        .wait_with_output()
        .map_err(|e| format!("failed to wait for {}: {}", program, e))?;

    if let Err(e) = written {
        if out.status.success() {
            return Err(format!("failed to write to {}: {}", program, e));
        }
    }

    if out.status.success() {
        Ok(())
    } else {
        Err(format!("{} failed: {}", program, summary(&out)))
    }
}

/// Most useful part of a failed command's output
fn summary(out: &Output) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !stdout.is_empty() {
        return stdout;
    }
    format!("status {}", out.status)
}
