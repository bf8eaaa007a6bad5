use anyhow::{bail, Result};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

const PROBE_ARGS: &[&str] = &["-v", "quiet", "-print_format", "json", "-show_streams"];

/// `ffprobe -show_streams` JSON describing every stream of a container.
pub fn probe_streams(path: &Path) -> Result<Vec<u8>> {
    let output = match Command::new("ffprobe").args(PROBE_ARGS).arg(path).output() {
        Ok(output) => output,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            bail!("ffprobe not found; install ffmpeg to inspect embedded tracks")
        }
        Err(e) => bail!("Failed to run ffprobe: {e}"),
    };

    if !output.status.success() {
        bail!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}
