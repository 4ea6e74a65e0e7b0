//! Video download via an external downloader program (`yt-dlp` by default).

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument};

use brandguard_shared::{BrandGuardError, Result};

use crate::LocalMedia;

/// File name given to downloaded videos inside their temp directory.
const MEDIA_FILE_NAME: &str = "audit_video.mp4";

/// Download `url` with `program` into a fresh [`LocalMedia`].
///
/// The downloader is asked for a single mp4 stream; playlists are ignored.
#[instrument(skip_all, fields(url = %url, program = %program))]
pub async fn download_video(program: &str, url: &str) -> Result<LocalMedia> {
    let media = LocalMedia::staged(MEDIA_FILE_NAME)?;

    info!("downloading video");

    let output = Command::new(program)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--format")
        .arg("best[ext=mp4]/best")
        .arg("--output")
        .arg(media.path())
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            BrandGuardError::Video(format!(
                "failed to run downloader: {e}. Is `{program}` installed?"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BrandGuardError::Video(format!(
            "download failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    if !media.path().exists() {
        return Err(BrandGuardError::Video(format!(
            "downloader reported success but produced no file for {url}"
        )));
    }

    debug!(path = %media.path().display(), "video downloaded");
    Ok(media)
}
