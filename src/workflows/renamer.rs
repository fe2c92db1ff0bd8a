use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::models::MediaKind;
use crate::error::{Result, SubtitlerError};

/// The video path without its extension, e.g. `dir/Show.S01E01` for
/// `dir/Show.S01E01.mkv`.
pub fn video_base(video: &Path) -> Result<PathBuf> {
    match MediaKind::of(video) {
        Some(MediaKind::Video) => Ok(video.with_extension("")),
        _ => Err(SubtitlerError::PathNotRecognized {
            path: video.to_path_buf(),
        }),
    }
}

fn subtitle_extension(subtitle: &Path) -> Result<&str> {
    match (MediaKind::of(subtitle), subtitle.extension().and_then(|s| s.to_str())) {
        (Some(MediaKind::Subtitle), Some(ext)) => Ok(ext),
        _ => Err(SubtitlerError::PathNotRecognized {
            path: subtitle.to_path_buf(),
        }),
    }
}

/// `<base>.<suffix>` without going through a lossy string conversion.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Picks where `subtitle` should live next to `video`.
///
/// The preferred name is `<video base>.<ext>`. When something else already
/// occupies it, `index` (the subtitle's position among the video's
/// subtitles) is inserted, and bumped further if that name is taken too.
pub fn target_path(video: &Path, subtitle: &Path, index: usize) -> Result<PathBuf> {
    let base = video_base(video)?;
    let ext = subtitle_extension(subtitle)?;

    let mut path = with_suffix(&base, ext);
    let mut counter = index;

    while path.exists() && path != subtitle {
        path = with_suffix(&base, &format!("{counter}.{ext}"));
        counter += 1;
    }

    Ok(path)
}

/// Moves `subtitle` next to `video` and returns its new path.
pub fn rename_subtitle(video: &Path, subtitle: &Path, index: usize) -> Result<PathBuf> {
    let new_path = target_path(video, subtitle, index)?;

    if new_path == subtitle {
        debug!(path = %subtitle.display(), "subtitle is already named correctly");
        return Ok(new_path);
    }

    fs::rename(subtitle, &new_path).map_err(|e| SubtitlerError::io(subtitle, e))?;
    info!(
        from = %subtitle.display(),
        to = %new_path.display(),
        "renamed subtitle"
    );
    Ok(new_path)
}
